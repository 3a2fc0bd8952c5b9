//! Stackform network topology: subnet allocation, NAT egress, routing.
//!
//! Builds the VPC half of a stack: one private and one public subnet
//! per availability zone, a NAT gateway per zone, a shared public route
//! table, a private route table per zone, and the stack's security group.
//!
//! # Components
//!
//! - **`allocator`**: Deterministic index → CIDR block mapping
//! - **`zone`**: Zones and the pure subnet plan derived from them
//! - **`builder`**: Typestate pipeline declaring the network resources

pub mod allocator;
pub mod builder;
pub mod zone;

pub use allocator::CidrAllocator;
pub use builder::{
    EgressProvisioned, NetworkCreated, NetworkOutputs, NetworkTopologyBuilder,
    NatBinding, PublicRouteTableReady, RouteTableBinding, RoutingBound, SecurityBound,
    SecurityGroupSpec, SubnetsAllocated, ZoneSubnet,
};
pub use zone::{SubnetPlan, Zone, plan_subnets, subnet_index};
