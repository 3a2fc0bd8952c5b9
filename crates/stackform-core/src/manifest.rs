//! Rendered manifest handed to the provisioning engine.
//!
//! The manifest borrows from the graph it renders. Resources appear in
//! realization order, each with its prerequisite ids and the wave it
//! belongs to, followed by the named outputs. The fingerprint is a
//! SHA-256 over the canonical JSON of resources and outputs, so two
//! syntheses of the same configuration always agree on it.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::{BackendConfig, ProviderConfig};
use crate::error::SynthResult;
use crate::graph::ResourceGraph;
use crate::types::{OutputValue, Resource, ResourceId, ResourceKind};

/// Whether the engine creates a resource or only reads an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceMode {
    Managed,
    Data,
}

impl ResourceMode {
    pub fn of(kind: ResourceKind) -> Self {
        if kind.is_data_source() {
            ResourceMode::Data
        } else {
            ResourceMode::Managed
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ManifestResource<'a> {
    pub id: &'a ResourceId,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub mode: ResourceMode,
    pub wave: usize,
    pub depends_on: Vec<&'a ResourceId>,
    pub config: &'a Resource,
}

#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub stack: &'a str,
    pub environment: &'a str,
    pub provider: &'a ProviderConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'a BackendConfig>,
    pub resources: Vec<ManifestResource<'a>>,
    pub outputs: &'a BTreeMap<String, OutputValue>,
    pub fingerprint: String,
}

impl<'a> Manifest<'a> {
    pub fn render(
        stack: &'a str,
        environment: &'a str,
        provider: &'a ProviderConfig,
        backend: Option<&'a BackendConfig>,
        graph: &'a ResourceGraph,
    ) -> SynthResult<Self> {
        let mut wave_of: BTreeMap<&ResourceId, usize> = BTreeMap::new();
        for (wave, nodes) in graph.waves().into_iter().enumerate() {
            for node in nodes {
                wave_of.insert(node.id(), wave);
            }
        }

        let resources: Vec<ManifestResource<'a>> = graph
            .topological_order()
            .map(|node| ManifestResource {
                id: node.id(),
                kind: node.kind(),
                mode: ResourceMode::of(node.kind()),
                wave: wave_of.get(node.id()).copied().unwrap_or_default(),
                depends_on: node.depends_on().iter().collect(),
                config: node.resource(),
            })
            .collect();

        let fingerprint = fingerprint(&resources, graph.outputs())?;

        Ok(Manifest {
            stack,
            environment,
            provider,
            backend,
            resources,
            outputs: graph.outputs(),
            fingerprint,
        })
    }

    pub fn to_json_pretty(&self) -> SynthResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn fingerprint(
    resources: &[ManifestResource<'_>],
    outputs: &BTreeMap<String, OutputValue>,
) -> SynthResult<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(resources)?);
    hasher.update(serde_json::to_vec(outputs)?);
    Ok(hex::encode(hasher.finalize()))
}
