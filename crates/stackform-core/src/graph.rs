//! Resource dependency graph.
//!
//! Nodes are kept in insertion order and a node may only be added once
//! every resource it references (or explicitly depends on) is already
//! present. The graph is therefore acyclic by construction and its
//! insertion order is always a valid realization order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::error::{SynthError, SynthResult};
use crate::types::{OutputValue, Reference, Resource, ResourceId, ResourceKind, ResourceRef};

/// A declared resource plus its prerequisite set.
#[derive(Debug, Clone)]
pub struct Node {
    id: ResourceId,
    resource: Resource,
    depends_on: BTreeSet<ResourceId>,
    /// Prerequisites declared explicitly rather than implied by a reference.
    explicit: BTreeSet<ResourceId>,
}

impl Node {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.kind(), self.id.clone())
    }

    /// Every prerequisite, implied or explicit.
    pub fn depends_on(&self) -> &BTreeSet<ResourceId> {
        &self.depends_on
    }

    pub fn explicit_depends_on(&self) -> &BTreeSet<ResourceId> {
        &self.explicit
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: Vec<Node>,
    index: HashMap<ResourceId, usize>,
    outputs: BTreeMap<String, OutputValue>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource whose only prerequisites are the ones it references.
    pub fn add(&mut self, id: impl Into<String>, resource: Resource) -> SynthResult<ResourceRef> {
        self.add_with_deps(id, resource, &[])
    }

    /// Declare a resource with additional explicit prerequisites.
    ///
    /// Fails with `DuplicateResource` if the id is taken, and with
    /// `DependencyMissing` if any prerequisite has not been declared yet.
    pub fn add_with_deps(
        &mut self,
        id: impl Into<String>,
        resource: Resource,
        explicit: &[&ResourceRef],
    ) -> SynthResult<ResourceRef> {
        let id = ResourceId::new(id);
        let this = ResourceRef::new(resource.kind(), id.clone());
        if self.index.contains_key(&id) {
            return Err(SynthError::DuplicateResource(this.to_string()));
        }

        let mut depends_on = BTreeSet::new();
        for target in resource.references().into_iter().map(Reference::target) {
            self.require(&this, target)?;
            depends_on.insert(target.id().clone());
        }
        let mut explicit_ids = BTreeSet::new();
        for target in explicit {
            self.require(&this, target)?;
            depends_on.insert(target.id().clone());
            explicit_ids.insert(target.id().clone());
        }

        debug!(resource = %this, deps = depends_on.len(), "declared resource");

        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(Node {
            id,
            resource,
            depends_on,
            explicit: explicit_ids,
        });
        Ok(this)
    }

    /// Error unless `target` is already declared with the expected kind.
    pub fn require(&self, dependent: &ResourceRef, target: &ResourceRef) -> SynthResult<()> {
        match self.get(target.id()) {
            Some(node) if node.kind() == target.kind() => Ok(()),
            _ => Err(SynthError::missing(dependent.to_string(), target.to_string())),
        }
    }

    /// Declare a named output. Every referenced resource must exist.
    pub fn add_output(&mut self, name: &str, value: OutputValue) -> SynthResult<()> {
        if self.outputs.contains_key(name) {
            return Err(SynthError::DuplicateResource(format!("output.{name}")));
        }
        let dependent = format!("output.{name}");
        for target in value.references().into_iter().map(Reference::target) {
            if !self.contains(target) {
                return Err(SynthError::missing(dependent, target.to_string()));
            }
        }
        self.outputs.insert(name.to_string(), value);
        Ok(())
    }

    pub fn outputs(&self) -> &BTreeMap<String, OutputValue> {
        &self.outputs
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node(&self, r: &ResourceRef) -> Option<&Node> {
        self.get(r.id()).filter(|n| n.kind() == r.kind())
    }

    pub fn contains(&self, r: &ResourceRef) -> bool {
        self.node(r).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in realization order (every node after all its prerequisites).
    pub fn topological_order(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Direct prerequisites of `r`, or `None` if it is not declared.
    pub fn dependencies_of(&self, r: &ResourceRef) -> Option<&BTreeSet<ResourceId>> {
        self.node(r).map(Node::depends_on)
    }

    /// Transitive prerequisites of `r`, excluding `r` itself.
    pub fn ancestors(&self, r: &ResourceRef) -> BTreeSet<ResourceId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&ResourceId> = match self.node(r) {
            Some(node) => node.depends_on.iter().collect(),
            None => return seen,
        };
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.get(id) {
                stack.extend(node.depends_on.iter());
            }
        }
        seen
    }

    /// True if `downstream` transitively requires `upstream`.
    pub fn depends_on(&self, downstream: &ResourceRef, upstream: &ResourceRef) -> bool {
        self.ancestors(downstream).contains(upstream.id())
    }

    /// True if neither resource requires the other and they share no
    /// prerequisites, so an engine may realize both branches concurrently.
    pub fn are_independent(&self, a: &ResourceRef, b: &ResourceRef) -> bool {
        let mut a_closure = self.ancestors(a);
        a_closure.insert(a.id().clone());
        let mut b_closure = self.ancestors(b);
        b_closure.insert(b.id().clone());
        a_closure.is_disjoint(&b_closure)
    }

    /// Group nodes into waves: every node in wave `n` depends only on
    /// nodes in earlier waves. Ids within a wave are sorted.
    pub fn waves(&self) -> Vec<Vec<&Node>> {
        let mut depth: Vec<usize> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let d = node
                .depends_on
                .iter()
                .filter_map(|dep| self.index.get(dep))
                .map(|&i| depth[i] + 1)
                .max()
                .unwrap_or(0);
            depth.push(d);
        }

        let mut waves: Vec<Vec<&Node>> = Vec::new();
        for (node, &d) in self.nodes.iter().zip(&depth) {
            if waves.len() <= d {
                waves.resize_with(d + 1, Vec::new);
            }
            waves[d].push(node);
        }
        for wave in &mut waves {
            wave.sort_by(|a, b| a.id.cmp(&b.id));
        }
        waves
    }
}
