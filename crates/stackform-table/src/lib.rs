//! Stackform replicated table: global table, execution role, stream handler.
//!
//! Declares a multi-region table with its change stream, an IAM role the
//! stream handler assumes, and the handler itself wired to the stream.
//! Nothing here references the network; the branch is independent of the
//! VPC and can be realized alongside it.
//!
//! # Components
//!
//! - **`policy`**: Managed-policy name resolution
//! - **`provisioner`**: Table, role, and handler declarations

pub mod policy;
pub mod provisioner;

pub use policy::{AwsManagedPolicies, PolicyCatalog};
pub use provisioner::{
    ExecutionRole, HandlerBinding, HandlerSpec, ReplicatedTable, ReplicatedTableProvisioner,
    SEARCH_POLICY, SkipReason, TABLE_POLICY, TableSpec,
};
