//! Network topology builder.
//!
//! The topology is declared in six ordered stages. Each stage is its own
//! type: it consumes the previous stage's context and returns the next,
//! so a stage can only run once everything it wires against exists.
//!
//! ```text
//! NetworkCreated          VPC + internet gateway
//!   └─ PublicRouteTableReady   public table, default route → IGW
//!       └─ SubnetsAllocated        private + public subnet per zone
//!           └─ EgressProvisioned       EIP + NAT gateway per public subnet
//!               └─ RoutingBound            associations, private table per zone
//!                   └─ SecurityBound           security group + 2 rules
//! ```
//!
//! Any error aborts the build and drops the graph; nothing is retried.

use tracing::{debug, info};

use stackform_core::config::NetworkConfig;
use stackform_core::*;

use crate::allocator::CidrAllocator;
use crate::zone::{SubnetPlan, Zone, plan_subnets};

/// Fixed settings shared by every stage.
#[derive(Debug, Clone)]
pub struct NetworkTopologyBuilder {
    zones: Vec<Zone>,
    allocator: CidrAllocator,
    tags: Tags,
    security_group_name: String,
}

impl NetworkTopologyBuilder {
    pub fn new(zones: Vec<Zone>, allocator: CidrAllocator, tags: Tags) -> Self {
        Self {
            zones,
            allocator,
            tags,
            security_group_name: "custom-vpc-opensearch-rule".to_string(),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> SynthResult<Self> {
        if config.availability_zones.is_empty() {
            return Err(SynthError::config(
                "network.availability_zones",
                "at least one availability zone is required",
            ));
        }
        let allocator = CidrAllocator::new(config.cidr_block, config.subnet_prefix)?;
        Ok(Self::new(
            Zone::from_names(&config.availability_zones),
            allocator,
            config.tags.clone(),
        ))
    }

    pub fn with_security_group_name(mut self, name: impl Into<String>) -> Self {
        self.security_group_name = name.into();
        self
    }

    fn tags(&self, extra: &[(&str, &str)]) -> Tags {
        let mut tags = self.tags.clone();
        for (k, v) in extra {
            tags.insert(k.to_string(), v.to_string());
        }
        tags
    }

    /// Run every stage into `graph`.
    pub fn build(self, graph: ResourceGraph) -> SynthResult<(ResourceGraph, NetworkOutputs)> {
        Ok(self
            .create_network(graph)?
            .route_public()?
            .allocate_subnets()?
            .provision_egress()?
            .bind_routing()?
            .bind_security()?
            .finish())
    }

    /// Stage 1: the VPC and its internet gateway.
    pub fn create_network(self, mut graph: ResourceGraph) -> SynthResult<NetworkCreated> {
        let vpc = graph.add(
            "vpc",
            Resource::Vpc(Vpc {
                cidr_block: self.allocator.base(),
                enable_dns_hostnames: true,
                tags: self.tags(&[]),
            }),
        )?;
        let internet_gateway = graph.add(
            "internet-gateway",
            Resource::InternetGateway(InternetGateway {
                vpc_id: vpc.id_attr(),
                tags: self.tags(&[]),
            }),
        )?;
        info!(cidr = %self.allocator.base(), zones = self.zones.len(), "network created");

        Ok(NetworkCreated {
            settings: self,
            graph,
            vpc,
            internet_gateway,
        })
    }
}

/// A subnet declaration with the plan it was built from.
#[derive(Debug, Clone)]
pub struct ZoneSubnet {
    pub plan: SubnetPlan,
    pub subnet: ResourceRef,
}

/// One zone's egress point.
#[derive(Debug, Clone)]
pub struct NatBinding {
    pub zone: Zone,
    pub eip: ResourceRef,
    pub nat_gateway: ResourceRef,
    pub public_subnet: ResourceRef,
}

/// A route table and the target of its default route.
#[derive(Debug, Clone)]
pub struct RouteTableBinding {
    pub visibility: Visibility,
    /// `None` for the shared public table.
    pub zone: Option<Zone>,
    pub route_table: ResourceRef,
    pub default_route: ResourceRef,
    pub route_target: ResourceRef,
}

/// The security group and its two rules.
#[derive(Debug, Clone)]
pub struct SecurityGroupSpec {
    pub group: ResourceRef,
    pub self_ingress: ResourceRef,
    pub open_egress: ResourceRef,
}

pub struct NetworkCreated {
    settings: NetworkTopologyBuilder,
    graph: ResourceGraph,
    vpc: ResourceRef,
    internet_gateway: ResourceRef,
}

impl NetworkCreated {
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn vpc(&self) -> &ResourceRef {
        &self.vpc
    }

    /// Stage 2: the shared public route table with its default route to
    /// the internet gateway.
    pub fn route_public(self) -> SynthResult<PublicRouteTableReady> {
        let NetworkCreated {
            settings,
            mut graph,
            vpc,
            internet_gateway,
        } = self;

        let route_table = graph.add(
            "public-route-table",
            Resource::RouteTable(RouteTable {
                vpc_id: vpc.id_attr(),
                tags: settings.tags(&[("Visibility", Visibility::Public.as_str())]),
            }),
        )?;
        let default_route = graph.add(
            "public-default-route",
            Resource::Route(Route {
                route_table_id: route_table.id_attr(),
                destination_cidr_block: Cidr::ANY,
                target: RouteTarget::GatewayId(internet_gateway.id_attr()),
            }),
        )?;
        info!("public route table ready");

        Ok(PublicRouteTableReady {
            settings,
            graph,
            vpc,
            public_route: RouteTableBinding {
                visibility: Visibility::Public,
                zone: None,
                route_table,
                default_route,
                route_target: internet_gateway,
            },
        })
    }
}

pub struct PublicRouteTableReady {
    settings: NetworkTopologyBuilder,
    graph: ResourceGraph,
    vpc: ResourceRef,
    public_route: RouteTableBinding,
}

impl PublicRouteTableReady {
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn public_route_table(&self) -> &RouteTableBinding {
        &self.public_route
    }

    /// Stage 3: a private and a public subnet for every zone.
    pub fn allocate_subnets(self) -> SynthResult<SubnetsAllocated> {
        let PublicRouteTableReady {
            settings,
            mut graph,
            vpc,
            public_route,
        } = self;

        let plans = plan_subnets(&settings.zones, &settings.allocator)?;
        let mut private_subnets = Vec::with_capacity(settings.zones.len());
        let mut public_subnets = Vec::with_capacity(settings.zones.len());

        for plan in plans {
            let visibility = plan.visibility;
            let subnet = graph.add(
                format!("{}-subnet-{}", visibility.as_str(), plan.zone.ordinal()),
                Resource::Subnet(Subnet {
                    vpc_id: vpc.id_attr(),
                    availability_zone: plan.zone.name().to_string(),
                    cidr_block: plan.cidr_block,
                    map_public_ip_on_launch: visibility == Visibility::Public,
                    tags: settings.tags(&[("Visibility", visibility.as_str())]),
                }),
            )?;
            debug!(
                zone = plan.zone.name(),
                visibility = visibility.as_str(),
                cidr = %plan.cidr_block,
                "subnet allocated"
            );
            let entry = ZoneSubnet { plan, subnet };
            match visibility {
                Visibility::Private => private_subnets.push(entry),
                Visibility::Public => public_subnets.push(entry),
            }
        }
        info!(
            private = private_subnets.len(),
            public = public_subnets.len(),
            "subnets allocated"
        );

        Ok(SubnetsAllocated {
            settings,
            graph,
            vpc,
            public_route,
            private_subnets,
            public_subnets,
        })
    }
}

pub struct SubnetsAllocated {
    settings: NetworkTopologyBuilder,
    graph: ResourceGraph,
    vpc: ResourceRef,
    public_route: RouteTableBinding,
    private_subnets: Vec<ZoneSubnet>,
    public_subnets: Vec<ZoneSubnet>,
}

impl SubnetsAllocated {
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn private_subnets(&self) -> &[ZoneSubnet] {
        &self.private_subnets
    }

    pub fn public_subnets(&self) -> &[ZoneSubnet] {
        &self.public_subnets
    }

    /// Stage 4: an elastic IP and NAT gateway in every public subnet, in
    /// zone order.
    pub fn provision_egress(self) -> SynthResult<EgressProvisioned> {
        let SubnetsAllocated {
            settings,
            mut graph,
            vpc,
            public_route,
            private_subnets,
            public_subnets,
        } = self;

        let mut nat_bindings = Vec::with_capacity(public_subnets.len());
        for public in &public_subnets {
            let zone = &public.plan.zone;
            let eip = graph.add(
                format!("nat-eip-{}", zone.ordinal()),
                Resource::Eip(Eip {
                    domain: "vpc".to_string(),
                    tags: settings.tags(&[]),
                }),
            )?;
            let nat_gateway = graph.add(
                format!("nat-gateway-{}", zone.ordinal()),
                Resource::NatGateway(NatGateway {
                    allocation_id: eip.id_attr(),
                    subnet_id: public.subnet.id_attr(),
                    tags: settings.tags(&[]),
                }),
            )?;
            debug!(zone = zone.name(), nat = %nat_gateway, "nat gateway declared");
            nat_bindings.push(NatBinding {
                zone: zone.clone(),
                eip,
                nat_gateway,
                public_subnet: public.subnet.clone(),
            });
        }
        info!(nat_gateways = nat_bindings.len(), "egress provisioned");

        Ok(EgressProvisioned {
            settings,
            graph,
            vpc,
            public_route,
            private_subnets,
            public_subnets,
            nat_bindings,
        })
    }
}

pub struct EgressProvisioned {
    settings: NetworkTopologyBuilder,
    graph: ResourceGraph,
    vpc: ResourceRef,
    public_route: RouteTableBinding,
    private_subnets: Vec<ZoneSubnet>,
    public_subnets: Vec<ZoneSubnet>,
    nat_bindings: Vec<NatBinding>,
}

impl EgressProvisioned {
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn nat_bindings(&self) -> &[NatBinding] {
        &self.nat_bindings
    }

    /// Stage 5: public subnets join the public table; each private subnet
    /// gets its own table routed through its own zone's NAT gateway.
    pub fn bind_routing(self) -> SynthResult<RoutingBound> {
        let EgressProvisioned {
            settings,
            mut graph,
            vpc,
            public_route,
            private_subnets,
            public_subnets,
            nat_bindings,
        } = self;

        for public in &public_subnets {
            graph.add(
                format!("public-subnet-association-{}", public.plan.zone.ordinal()),
                Resource::RouteTableAssociation(RouteTableAssociation {
                    route_table_id: public_route.route_table.id_attr(),
                    subnet_id: public.subnet.id_attr(),
                }),
            )?;
        }

        let mut private_routes = Vec::with_capacity(private_subnets.len());
        for private in &private_subnets {
            let zone = &private.plan.zone;
            let ordinal = zone.ordinal();
            let nat = nat_bindings
                .iter()
                .find(|b| b.zone.ordinal() == ordinal)
                .ok_or_else(|| {
                    SynthError::missing(
                        format!("private route for zone {} (ordinal {ordinal})", zone.name()),
                        format!("NAT gateway for zone {} (ordinal {ordinal})", zone.name()),
                    )
                })?;

            let route_table = graph.add(
                format!("private-route-table-{ordinal}"),
                Resource::RouteTable(RouteTable {
                    vpc_id: vpc.id_attr(),
                    tags: settings.tags(&[("Visibility", Visibility::Private.as_str())]),
                }),
            )?;
            let default_route = graph.add(
                format!("private-default-route-{ordinal}"),
                Resource::Route(Route {
                    route_table_id: route_table.id_attr(),
                    destination_cidr_block: Cidr::ANY,
                    target: RouteTarget::NatGatewayId(nat.nat_gateway.id_attr()),
                }),
            )?;
            graph.add(
                format!("private-subnet-association-{ordinal}"),
                Resource::RouteTableAssociation(RouteTableAssociation {
                    route_table_id: route_table.id_attr(),
                    subnet_id: private.subnet.id_attr(),
                }),
            )?;
            private_routes.push(RouteTableBinding {
                visibility: Visibility::Private,
                zone: Some(zone.clone()),
                route_table,
                default_route,
                route_target: nat.nat_gateway.clone(),
            });
        }
        info!(private_route_tables = private_routes.len(), "routing bound");

        Ok(RoutingBound {
            settings,
            graph,
            vpc,
            public_route,
            private_subnets,
            public_subnets,
            nat_bindings,
            private_routes,
        })
    }
}

pub struct RoutingBound {
    settings: NetworkTopologyBuilder,
    graph: ResourceGraph,
    vpc: ResourceRef,
    public_route: RouteTableBinding,
    private_subnets: Vec<ZoneSubnet>,
    public_subnets: Vec<ZoneSubnet>,
    nat_bindings: Vec<NatBinding>,
    private_routes: Vec<RouteTableBinding>,
}

impl RoutingBound {
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn private_route_tables(&self) -> &[RouteTableBinding] {
        &self.private_routes
    }

    /// Stage 6: the security group with self-ingress and open egress.
    pub fn bind_security(self) -> SynthResult<SecurityBound> {
        let RoutingBound {
            settings,
            mut graph,
            vpc,
            public_route,
            private_subnets,
            public_subnets,
            nat_bindings,
            private_routes,
        } = self;

        let group = graph.add(
            "security-group",
            Resource::SecurityGroup(SecurityGroup {
                name: settings.security_group_name.clone(),
                vpc_id: vpc.id_attr(),
                tags: settings.tags(&[]),
            }),
        )?;
        let self_ingress = graph.add(
            "security-group-ingress-self",
            Resource::SecurityGroupRule(SecurityGroupRule {
                security_group_id: group.id_attr(),
                direction: RuleDirection::Ingress,
                protocol: "all".to_string(),
                from_port: 0,
                to_port: 0,
                peer: RulePeer::SourceSecurityGroupId(group.id_attr()),
            }),
        )?;
        let open_egress = graph.add(
            "security-group-egress-all",
            Resource::SecurityGroupRule(SecurityGroupRule {
                security_group_id: group.id_attr(),
                direction: RuleDirection::Egress,
                protocol: "all".to_string(),
                from_port: 0,
                to_port: 0,
                peer: RulePeer::CidrBlocks(vec![Cidr::ANY]),
            }),
        )?;
        info!(group = %group, "security bound");

        Ok(SecurityBound {
            graph,
            vpc,
            public_route,
            private_subnets,
            public_subnets,
            nat_bindings,
            private_routes,
            security: SecurityGroupSpec {
                group,
                self_ingress,
                open_egress,
            },
        })
    }
}

pub struct SecurityBound {
    graph: ResourceGraph,
    vpc: ResourceRef,
    public_route: RouteTableBinding,
    private_subnets: Vec<ZoneSubnet>,
    public_subnets: Vec<ZoneSubnet>,
    nat_bindings: Vec<NatBinding>,
    private_routes: Vec<RouteTableBinding>,
    security: SecurityGroupSpec,
}

impl SecurityBound {
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Hand back the graph and the references downstream provisioners need.
    pub fn finish(self) -> (ResourceGraph, NetworkOutputs) {
        let outputs = NetworkOutputs {
            vpc: self.vpc,
            public_route_table: self.public_route,
            private_subnets: self.private_subnets,
            public_subnets: self.public_subnets,
            nat_gateways: self.nat_bindings,
            private_route_tables: self.private_routes,
            security_group: self.security,
        };
        (self.graph, outputs)
    }
}

/// What the network exposes to the rest of the stack.
#[derive(Debug, Clone)]
pub struct NetworkOutputs {
    pub vpc: ResourceRef,
    pub public_route_table: RouteTableBinding,
    /// In zone order.
    pub private_subnets: Vec<ZoneSubnet>,
    /// In zone order.
    pub public_subnets: Vec<ZoneSubnet>,
    pub nat_gateways: Vec<NatBinding>,
    pub private_route_tables: Vec<RouteTableBinding>,
    pub security_group: SecurityGroupSpec,
}

impl NetworkOutputs {
    pub fn zone_count(&self) -> usize {
        self.private_subnets.len()
    }

    /// Private subnet ids, in zone order.
    pub fn private_subnet_ids(&self) -> Vec<Reference> {
        self.private_subnets.iter().map(|s| s.subnet.id_attr()).collect()
    }

    pub fn public_subnet_ids(&self) -> Vec<Reference> {
        self.public_subnets.iter().map(|s| s.subnet.id_attr()).collect()
    }

    pub fn security_group_id(&self) -> Reference {
        self.security_group.group.id_attr()
    }

    /// `{vpc, publicSubnets, privateSubnets}` for inspection.
    pub fn vpc_data(&self) -> OutputValue {
        OutputValue::Map(
            [
                ("vpc".to_string(), OutputValue::One(self.vpc.id_attr())),
                ("publicSubnets".to_string(), OutputValue::Many(self.public_subnet_ids())),
                ("privateSubnets".to_string(), OutputValue::Many(self.private_subnet_ids())),
            ]
            .into_iter()
            .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_names(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("us-east-1{}", (b'a' + i as u8) as char))
            .collect()
    }

    fn builder(count: usize) -> NetworkTopologyBuilder {
        NetworkTopologyBuilder::new(
            Zone::from_names(&zone_names(count)),
            CidrAllocator::new("10.0.0.0/16".parse().unwrap(), 24).unwrap(),
            Tags::from([("Team".to_string(), "search".to_string())]),
        )
    }

    fn build(count: usize) -> (ResourceGraph, NetworkOutputs) {
        builder(count).build(ResourceGraph::new()).unwrap()
    }

    fn route_of<'a>(graph: &'a ResourceGraph, r: &ResourceRef) -> &'a Route {
        match graph.node(r).unwrap().resource() {
            Resource::Route(route) => route,
            other => panic!("expected route, got {:?}", other.kind()),
        }
    }

    #[test]
    fn three_zone_scenario() {
        let (graph, out) = build(3);

        assert_eq!(graph.count_of(ResourceKind::Vpc), 1);
        assert_eq!(graph.count_of(ResourceKind::InternetGateway), 1);
        assert_eq!(graph.count_of(ResourceKind::Subnet), 6);
        assert_eq!(graph.count_of(ResourceKind::NatGateway), 3);
        assert_eq!(graph.count_of(ResourceKind::Eip), 3);
        assert_eq!(graph.count_of(ResourceKind::RouteTable), 4);
        assert_eq!(graph.count_of(ResourceKind::Route), 4);
        assert_eq!(graph.count_of(ResourceKind::RouteTableAssociation), 6);
        assert_eq!(graph.count_of(ResourceKind::SecurityGroup), 1);
        assert_eq!(graph.count_of(ResourceKind::SecurityGroupRule), 2);

        assert_eq!(out.private_subnets.len(), 3);
        assert_eq!(out.public_subnets.len(), 3);
        assert_eq!(out.private_route_tables.len(), 3);
    }

    #[test]
    fn counts_scale_with_zone_count() {
        for z in 1..=8 {
            let (graph, out) = build(z);
            assert_eq!(graph.count_of(ResourceKind::NatGateway), z);
            assert_eq!(out.private_route_tables.len(), z);
            // One public table shared by every public subnet.
            assert_eq!(graph.count_of(ResourceKind::RouteTable), z + 1);
            assert_eq!(graph.count_of(ResourceKind::SecurityGroupRule), 2);
        }
    }

    #[test]
    fn private_routes_target_same_zone_nat() {
        for z in 1..=6 {
            let (graph, out) = build(z);
            for (ordinal, binding) in out.private_route_tables.iter().enumerate() {
                let nat = &out.nat_gateways[ordinal];
                assert_eq!(binding.zone.as_ref().unwrap().ordinal(), ordinal);
                assert_eq!(nat.zone.ordinal(), ordinal);
                assert_eq!(binding.route_target, nat.nat_gateway);

                let route = route_of(&graph, &binding.default_route);
                assert_eq!(route.target, RouteTarget::NatGatewayId(nat.nat_gateway.id_attr()));
                assert_eq!(route.destination_cidr_block, Cidr::ANY);
            }
        }
    }

    #[test]
    fn nat_sits_in_public_subnet_of_its_zone() {
        let (graph, out) = build(3);
        for (nat, public) in out.nat_gateways.iter().zip(&out.public_subnets) {
            assert_eq!(nat.public_subnet, public.subnet);
            assert!(graph.depends_on(&nat.nat_gateway, &public.subnet));
            assert!(graph.depends_on(&nat.nat_gateway, &nat.eip));
        }
    }

    #[test]
    fn public_table_routes_to_internet_gateway() {
        let (graph, out) = build(2);
        let route = route_of(&graph, &out.public_route_table.default_route);
        assert!(matches!(route.target, RouteTarget::GatewayId(_)));
        assert_eq!(out.public_route_table.route_target.kind(), ResourceKind::InternetGateway);
    }

    #[test]
    fn subnet_flags_and_blocks() {
        let (graph, out) = build(3);
        for (s, public) in out
            .private_subnets
            .iter()
            .map(|s| (s, false))
            .chain(out.public_subnets.iter().map(|s| (s, true)))
        {
            match graph.node(&s.subnet).unwrap().resource() {
                Resource::Subnet(subnet) => {
                    assert_eq!(subnet.map_public_ip_on_launch, public);
                    assert_eq!(subnet.cidr_block, s.plan.cidr_block);
                    assert_eq!(subnet.availability_zone, s.plan.zone.name());
                    assert_eq!(subnet.tags.get("Team").map(String::as_str), Some("search"));
                }
                other => panic!("expected subnet, got {:?}", other.kind()),
            }
        }
        assert_eq!(out.private_subnets[2].plan.cidr_block.to_string(), "10.0.3.0/24");
        assert_eq!(out.public_subnets[0].plan.cidr_block.to_string(), "10.0.4.0/24");
    }

    #[test]
    fn every_subnet_associated_once() {
        let (graph, out) = build(3);
        let associations: Vec<&RouteTableAssociation> = graph
            .of_kind(ResourceKind::RouteTableAssociation)
            .map(|n| match n.resource() {
                Resource::RouteTableAssociation(a) => a,
                _ => unreachable!(),
            })
            .collect();
        for s in out.private_subnets.iter().chain(&out.public_subnets) {
            let matching = associations
                .iter()
                .filter(|a| a.subnet_id == s.subnet.id_attr())
                .count();
            assert_eq!(matching, 1, "{} associated {matching} times", s.subnet);
        }
    }

    #[test]
    fn security_group_rules() {
        let (graph, out) = build(4);
        let rules: Vec<&SecurityGroupRule> = graph
            .of_kind(ResourceKind::SecurityGroupRule)
            .map(|n| match n.resource() {
                Resource::SecurityGroupRule(r) => r,
                _ => unreachable!(),
            })
            .collect();
        let group_id = out.security_group_id();

        let ingress: Vec<_> = rules
            .iter()
            .filter(|r| r.direction == RuleDirection::Ingress)
            .collect();
        assert_eq!(ingress.len(), 1);
        assert_eq!(ingress[0].peer, RulePeer::SourceSecurityGroupId(group_id.clone()));
        assert_eq!(ingress[0].protocol, "all");

        let egress: Vec<_> = rules
            .iter()
            .filter(|r| r.direction == RuleDirection::Egress)
            .collect();
        assert_eq!(egress.len(), 1);
        assert_eq!(egress[0].peer, RulePeer::CidrBlocks(vec![Cidr::ANY]));
    }

    #[test]
    fn missing_nat_names_the_zone() {
        let mut egress = builder(3)
            .create_network(ResourceGraph::new())
            .unwrap()
            .route_public()
            .unwrap()
            .allocate_subnets()
            .unwrap()
            .provision_egress()
            .unwrap();
        egress.nat_bindings.retain(|b| b.zone.ordinal() != 1);

        match egress.bind_routing() {
            Err(SynthError::DependencyMissing { resource, missing }) => {
                assert!(resource.contains("us-east-1b"));
                assert!(missing.contains("ordinal 1"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("routing bound without a NAT gateway"),
        }
    }

    #[test]
    fn stages_expose_progress() {
        let created = builder(2).create_network(ResourceGraph::new()).unwrap();
        assert_eq!(created.graph().len(), 2);
        assert_eq!(created.vpc().id().as_str(), "vpc");
        let ready = created.route_public().unwrap();
        assert_eq!(ready.public_route_table().visibility, Visibility::Public);
        assert_eq!(ready.graph().count_of(ResourceKind::Route), 1);
        let subnets = ready.allocate_subnets().unwrap();
        assert_eq!(subnets.private_subnets().len(), 2);
        assert_eq!(subnets.public_subnets().len(), 2);
        assert!(subnets.graph().count_of(ResourceKind::NatGateway) == 0);
        let egress = subnets.provision_egress().unwrap();
        let zones: Vec<&str> = egress.nat_bindings().iter().map(|b| b.zone.name()).collect();
        assert_eq!(zones, vec!["us-east-1a", "us-east-1b"]);
        assert_eq!(egress.graph().count_of(ResourceKind::Eip), 2);
        let routing = egress.bind_routing().unwrap();
        assert_eq!(routing.private_route_tables().len(), 2);
        assert_eq!(routing.graph().count_of(ResourceKind::SecurityGroup), 0);
        let security = routing.bind_security().unwrap();
        assert_eq!(security.graph().count_of(ResourceKind::SecurityGroupRule), 2);
    }

    #[test]
    fn security_group_name_is_configurable() {
        let (graph, out) = builder(1)
            .with_security_group_name("search-sg")
            .build(ResourceGraph::new())
            .unwrap();
        match graph.node(&out.security_group.group).unwrap().resource() {
            Resource::SecurityGroup(group) => assert_eq!(group.name, "search-sg"),
            other => panic!("expected security group, got {:?}", other.kind()),
        }
    }

    #[test]
    fn from_config_rejects_empty_zones() {
        let config = NetworkConfig {
            cidr_block: "10.0.0.0/16".parse().unwrap(),
            subnet_prefix: 24,
            availability_zones: Vec::new(),
            tags: Tags::new(),
        };
        assert!(matches!(
            NetworkTopologyBuilder::from_config(&config),
            Err(SynthError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn undersized_range_error_names_the_zone() {
        let config = NetworkConfig {
            cidr_block: "10.0.0.0/22".parse().unwrap(),
            subnet_prefix: 24,
            availability_zones: vec!["us-east-1a".to_string(), "us-east-1b".to_string()],
            tags: Tags::new(),
        };
        let err = NetworkTopologyBuilder::from_config(&config)
            .unwrap()
            .build(ResourceGraph::new())
            .unwrap_err();
        assert!(matches!(err, SynthError::InvalidAllocation { index: 4, .. }));
        assert!(err.to_string().contains("us-east-1b"));
        assert!(err.to_string().contains("ordinal 1"));
    }

    #[test]
    fn existing_ids_abort_the_build() {
        let mut graph = ResourceGraph::new();
        graph
            .add(
                "vpc",
                Resource::Eip(Eip {
                    domain: "vpc".to_string(),
                    tags: Tags::new(),
                }),
            )
            .unwrap();
        assert!(matches!(
            builder(1).build(graph),
            Err(SynthError::DuplicateResource(_))
        ));
    }

    #[test]
    fn vpc_data_output_shape() {
        let (_, out) = build(2);
        let json = serde_json::to_value(out.vpc_data()).unwrap();
        assert_eq!(json["vpc"], "${aws_vpc.vpc.id}");
        assert_eq!(json["privateSubnets"][1], "${aws_subnet.private-subnet-1.id}");
        assert_eq!(json["publicSubnets"].as_array().unwrap().len(), 2);
    }
}
