//! Search cluster provisioner.
//!
//! Maps sizing and the network's private subnets and security group onto
//! a single zone-aware domain declaration.

use tracing::info;

use stackform_core::config::SearchConfig;
use stackform_core::*;

/// Node counts and instance types for the domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSizing {
    pub dedicated_master_enabled: bool,
    pub dedicated_master_type: String,
    pub dedicated_master_count: u32,
    pub instance_type: String,
    pub instance_count: u32,
}

impl ClusterSizing {
    /// One node per zone, or a single node when there are no zones.
    pub fn default_count(zone_count: usize) -> u32 {
        if zone_count > 0 {
            u32::try_from(zone_count).unwrap_or(u32::MAX)
        } else {
            1
        }
    }

    /// Sizing for `zone_count` zones. Explicit overrides in `config` win.
    pub fn for_zone_count(zone_count: usize, config: &SearchConfig) -> Self {
        let default = Self::default_count(zone_count);
        Self {
            dedicated_master_enabled: config.dedicated_master_enabled,
            dedicated_master_type: config.dedicated_master_type.clone(),
            dedicated_master_count: config.dedicated_master_count.unwrap_or(default),
            instance_type: config.instance_type.clone(),
            instance_count: config.instance_count.unwrap_or(default),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageSpec {
    /// GiB per data node.
    pub volume_size: u32,
    pub volume_type: String,
    pub encrypt_at_rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchDomainSpec {
    pub domain_name: String,
    pub engine_version: String,
    pub sizing: ClusterSizing,
    pub storage: StorageSpec,
    pub tags: Tags,
}

impl SearchDomainSpec {
    pub fn from_config(config: &SearchConfig, zone_count: usize, tags: Tags) -> Self {
        Self {
            domain_name: config.domain_name.clone(),
            engine_version: config.engine_version.clone(),
            sizing: ClusterSizing::for_zone_count(zone_count, config),
            storage: StorageSpec {
                volume_size: config.volume_size,
                volume_type: config.volume_type.clone(),
                encrypt_at_rest: config.encrypt_at_rest,
            },
            tags,
        }
    }
}

/// A declared domain and the facts downstream resources read from it.
#[derive(Debug, Clone)]
pub struct SearchCluster {
    pub domain: ResourceRef,
    pub domain_name: String,
    /// Volume size actually provisioned, in GiB.
    pub volume_size: u32,
}

pub struct SearchClusterProvisioner {
    spec: SearchDomainSpec,
}

impl SearchClusterProvisioner {
    pub fn new(spec: SearchDomainSpec) -> Self {
        Self { spec }
    }

    /// Declare the domain inside the given subnets and security group.
    pub fn create(
        &self,
        graph: &mut ResourceGraph,
        private_subnet_ids: &[Reference],
        security_group_id: &Reference,
    ) -> SynthResult<SearchCluster> {
        let spec = &self.spec;
        if spec.sizing.instance_count == 0 {
            return Err(SynthError::config("search.instance_count", "must be positive"));
        }
        if spec.sizing.dedicated_master_count == 0 {
            return Err(SynthError::config("search.dedicated_master_count", "must be positive"));
        }
        if spec.storage.volume_size == 0 {
            return Err(SynthError::config("search.volume_size", "must be positive"));
        }

        let domain = graph.add(
            "search-domain",
            Resource::SearchDomain(SearchDomain {
                domain_name: spec.domain_name.clone(),
                engine_version: spec.engine_version.clone(),
                cluster_config: ClusterConfig {
                    dedicated_master_enabled: spec.sizing.dedicated_master_enabled,
                    dedicated_master_type: spec.sizing.dedicated_master_type.clone(),
                    dedicated_master_count: spec.sizing.dedicated_master_count,
                    instance_type: spec.sizing.instance_type.clone(),
                    instance_count: spec.sizing.instance_count,
                    zone_awareness_enabled: true,
                    zone_awareness_config: ZoneAwarenessConfig {
                        availability_zone_count: spec.sizing.instance_count,
                    },
                },
                ebs_options: EbsOptions {
                    ebs_enabled: true,
                    volume_size: spec.storage.volume_size,
                    volume_type: spec.storage.volume_type.clone(),
                },
                encrypt_at_rest: EncryptAtRest {
                    enabled: spec.storage.encrypt_at_rest,
                },
                vpc_options: VpcOptions {
                    subnet_ids: private_subnet_ids.to_vec(),
                    security_group_ids: vec![security_group_id.clone()],
                },
                tags: spec.tags.clone(),
            }),
        )?;
        info!(
            domain = %spec.domain_name,
            data_nodes = spec.sizing.instance_count,
            masters = spec.sizing.dedicated_master_count,
            volume_gib = spec.storage.volume_size,
            "search cluster declared"
        );

        Ok(SearchCluster {
            domain,
            domain_name: spec.domain_name.clone(),
            volume_size: spec.storage.volume_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_config() -> SearchConfig {
        TopologyConfig::scaffold("s").search
    }

    fn network_stub(graph: &mut ResourceGraph, zones: usize) -> (Vec<Reference>, Reference) {
        let vpc = graph
            .add(
                "vpc",
                Resource::Vpc(Vpc {
                    cidr_block: Cidr::DEFAULT_VPC,
                    enable_dns_hostnames: true,
                    tags: Tags::new(),
                }),
            )
            .unwrap();
        let subnets = (0..zones)
            .map(|i| {
                graph
                    .add(
                        format!("private-subnet-{i}"),
                        Resource::Subnet(Subnet {
                            vpc_id: vpc.id_attr(),
                            availability_zone: format!("us-east-1{}", (b'a' + i as u8) as char),
                            cidr_block: format!("10.0.{}.0/24", i + 1).parse().unwrap(),
                            map_public_ip_on_launch: false,
                            tags: Tags::new(),
                        }),
                    )
                    .unwrap()
                    .id_attr()
            })
            .collect();
        let sg = graph
            .add(
                "security-group",
                Resource::SecurityGroup(SecurityGroup {
                    name: "sg".to_string(),
                    vpc_id: vpc.id_attr(),
                    tags: Tags::new(),
                }),
            )
            .unwrap();
        (subnets, sg.id_attr())
    }

    fn domain_of<'a>(graph: &'a ResourceGraph, cluster: &SearchCluster) -> &'a SearchDomain {
        match graph.node(&cluster.domain).unwrap().resource() {
            Resource::SearchDomain(d) => d,
            other => panic!("expected domain, got {:?}", other.kind()),
        }
    }

    #[test]
    fn counts_follow_zone_count() {
        let sizing = ClusterSizing::for_zone_count(3, &search_config());
        assert_eq!(sizing.instance_count, 3);
        assert_eq!(sizing.dedicated_master_count, 3);
    }

    #[test]
    fn zero_zones_default_to_one() {
        let sizing = ClusterSizing::for_zone_count(0, &search_config());
        assert_eq!(sizing.instance_count, 1);
        assert_eq!(sizing.dedicated_master_count, 1);
    }

    #[test]
    fn overrides_win() {
        let mut config = search_config();
        config.instance_count = Some(6);
        config.dedicated_master_count = Some(3);
        let sizing = ClusterSizing::for_zone_count(2, &config);
        assert_eq!(sizing.instance_count, 6);
        assert_eq!(sizing.dedicated_master_count, 3);
    }

    #[test]
    fn domain_bound_to_network() {
        let mut graph = ResourceGraph::new();
        let (subnets, sg) = network_stub(&mut graph, 3);
        let spec = SearchDomainSpec::from_config(&search_config(), subnets.len(), Tags::new());
        let cluster = SearchClusterProvisioner::new(spec)
            .create(&mut graph, &subnets, &sg)
            .unwrap();

        let domain = domain_of(&graph, &cluster);
        assert_eq!(domain.vpc_options.subnet_ids, subnets);
        assert_eq!(domain.vpc_options.security_group_ids, vec![sg.clone()]);
        assert!(domain.cluster_config.zone_awareness_enabled);
        assert_eq!(domain.cluster_config.zone_awareness_config.availability_zone_count, 3);
        assert_eq!(domain.ebs_options.volume_size, 10);
        assert!(domain.ebs_options.ebs_enabled);
        assert!(!domain.encrypt_at_rest.enabled);
        assert!(graph.depends_on(&cluster.domain, sg.target()));
        assert_eq!(cluster.volume_size, 10);
    }

    #[test]
    fn zero_zone_cluster_has_single_nodes() {
        let mut graph = ResourceGraph::new();
        let (_, sg) = network_stub(&mut graph, 0);
        let spec = SearchDomainSpec::from_config(&search_config(), 0, Tags::new());
        let cluster = SearchClusterProvisioner::new(spec)
            .create(&mut graph, &[], &sg)
            .unwrap();

        let domain = domain_of(&graph, &cluster);
        assert_eq!(domain.cluster_config.instance_count, 1);
        assert_eq!(domain.cluster_config.dedicated_master_count, 1);
        assert_eq!(domain.cluster_config.zone_awareness_config.availability_zone_count, 1);
    }

    #[test]
    fn zero_volume_rejected() {
        let mut graph = ResourceGraph::new();
        let (subnets, sg) = network_stub(&mut graph, 1);
        let mut config = search_config();
        config.volume_size = 0;
        let spec = SearchDomainSpec::from_config(&config, 1, Tags::new());
        let before = graph.len();
        assert!(matches!(
            SearchClusterProvisioner::new(spec).create(&mut graph, &subnets, &sg),
            Err(SynthError::ConfigurationInvalid { .. })
        ));
        assert_eq!(graph.len(), before);
    }
}
