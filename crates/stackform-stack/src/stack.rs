//! Stack synthesis.

use std::collections::BTreeMap;

use tracing::info;

use stackform_core::*;
use stackform_network::{NetworkOutputs, NetworkTopologyBuilder};
use stackform_search::{AlarmThresholdDeriver, SearchCluster, SearchClusterProvisioner, SearchDomainSpec};
use stackform_table::{
    AwsManagedPolicies, HandlerSpec, PolicyCatalog, ReplicatedTable, ReplicatedTableProvisioner,
    TableSpec,
};

/// Name of the output exposing `{vpc, publicSubnets, privateSubnets}`.
pub const VPC_DATA_OUTPUT: &str = "vpc-data";

/// A fully synthesized topology.
#[derive(Debug)]
pub struct Stack {
    config: TopologyConfig,
    graph: ResourceGraph,
    network: NetworkOutputs,
    search: SearchCluster,
    alarm: ResourceRef,
    table: ReplicatedTable,
}

impl Stack {
    pub fn name(&self) -> &str {
        &self.config.stack.name
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn network(&self) -> &NetworkOutputs {
        &self.network
    }

    pub fn search_cluster(&self) -> &SearchCluster {
        &self.search
    }

    pub fn alarm(&self) -> &ResourceRef {
        &self.alarm
    }

    pub fn table(&self) -> &ReplicatedTable {
        &self.table
    }

    /// Declaration count per resource kind.
    pub fn kind_counts(&self) -> BTreeMap<ResourceKind, usize> {
        let mut counts = BTreeMap::new();
        for node in self.graph.topological_order() {
            *counts.entry(node.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn manifest(&self) -> SynthResult<Manifest<'_>> {
        Manifest::render(
            &self.config.stack.name,
            &self.config.stack.environment,
            &self.config.provider,
            self.config.backend.as_ref(),
            &self.graph,
        )
    }
}

/// Synthesize against the AWS-managed policy catalog plus any extra
/// policy names the configuration declares.
pub fn synthesize(config: TopologyConfig) -> SynthResult<Stack> {
    let catalog = AwsManagedPolicies::new().with_extra(config.policies.extra_managed.iter().cloned());
    synthesize_with(config, &catalog)
}

/// Synthesize the whole topology. Either every declaration succeeds or
/// the partially built graph is dropped with the error.
pub fn synthesize_with<C: PolicyCatalog + ?Sized>(config: TopologyConfig, catalog: &C) -> SynthResult<Stack> {
    config.validate()?;
    info!(
        stack = %config.stack.name,
        region = %config.provider.region,
        zones = config.network.availability_zones.len(),
        "synthesizing stack"
    );

    let builder = NetworkTopologyBuilder::from_config(&config.network)?;
    let (mut graph, network) = builder.build(ResourceGraph::new())?;

    let domain_spec = SearchDomainSpec::from_config(
        &config.search,
        network.zone_count(),
        config.network.tags.clone(),
    );
    let search = SearchClusterProvisioner::new(domain_spec).create(
        &mut graph,
        &network.private_subnet_ids(),
        &network.security_group_id(),
    )?;

    let alarm = AlarmThresholdDeriver::new(
        config.alarm.clone(),
        config.alarm_prefix(),
        config.stack.environment.clone(),
    )
    .declare(&mut graph, &search)?;

    let table = ReplicatedTableProvisioner::new(catalog, HandlerSpec::from(&config.handler))
        .create(&mut graph, &TableSpec::from_config(&config.table))?;

    graph.add_output(VPC_DATA_OUTPUT, network.vpc_data())?;

    info!(
        stack = %config.stack.name,
        resources = graph.len(),
        waves = graph.waves().len(),
        "stack synthesized"
    );

    Ok(Stack {
        config,
        graph,
        network,
        search,
        alarm,
        table,
    })
}
