//! Replicated table provisioner.
//!
//! `create` declares the table, then the handler's execution role, then
//! the handler. The handler carries explicit prerequisites on both the
//! table and the role, so the engine never wires it before either exists
//! even though the declarations are already issued in that order.

use std::collections::HashSet;

use serde_json::json;
use tracing::{debug, info, warn};

use stackform_core::config::{HandlerConfig, TableConfig};
use stackform_core::*;

use crate::policy::PolicyCatalog;

/// Full access to the table service.
pub const TABLE_POLICY: &str = "AmazonDynamoDBFullAccess";
/// Full access to the search service.
pub const SEARCH_POLICY: &str = "AmazonOpenSearchServiceFullAccess";

const HANDLER_PRINCIPAL: &str = "lambda.amazonaws.com";

#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub billing_mode: BillingMode,
    pub hash_key: AttributeDefinition,
    pub range_key: AttributeDefinition,
    /// Replica regions, in the order they are declared.
    pub replica_regions: Vec<String>,
    pub stream_view_type: StreamViewType,
    pub table_class: TableClass,
}

impl TableSpec {
    pub fn from_config(config: &TableConfig) -> Self {
        Self {
            name: config.name.clone(),
            billing_mode: config.billing_mode,
            hash_key: AttributeDefinition {
                name: config.hash_key.name.clone(),
                scalar: config.hash_key.scalar,
            },
            range_key: AttributeDefinition {
                name: config.range_key.name.clone(),
                scalar: config.range_key.scalar,
            },
            replica_regions: config.replica_regions.clone(),
            stream_view_type: config.stream_view_type,
            table_class: config.table_class,
        }
    }

    pub fn validate(&self) -> SynthResult<()> {
        if self.name.trim().is_empty() {
            return Err(SynthError::config("table.name", "must not be empty"));
        }
        if self.hash_key.name == self.range_key.name {
            return Err(SynthError::config(
                "table.range_key",
                format!("`{}` is already the hash key", self.range_key.name),
            ));
        }
        if self.replica_regions.is_empty() {
            return Err(SynthError::config(
                "table.replica_regions",
                "at least one replica region is required",
            ));
        }
        let mut seen = HashSet::new();
        for (ordinal, region) in self.replica_regions.iter().enumerate() {
            if !seen.insert(region.as_str()) {
                return Err(SynthError::config(
                    format!("table.replica_regions[{ordinal}]"),
                    format!("`{region}` is listed twice"),
                ));
            }
        }
        Ok(())
    }

    fn declaration(&self) -> DynamodbTable {
        DynamodbTable {
            name: self.name.clone(),
            billing_mode: self.billing_mode,
            hash_key: self.hash_key.name.clone(),
            range_key: self.range_key.name.clone(),
            attribute: vec![self.hash_key.clone(), self.range_key.clone()],
            replica: self
                .replica_regions
                .iter()
                .map(|region| Replica {
                    region_name: region.clone(),
                })
                .collect(),
            stream_enabled: true,
            stream_view_type: self.stream_view_type,
            table_class: self.table_class,
        }
    }
}

/// The handler's package, referenced by path and entry point only.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSpec {
    pub package: String,
    pub entry_point: String,
    pub runtime: String,
}

impl From<&HandlerConfig> for HandlerSpec {
    fn from(config: &HandlerConfig) -> Self {
        Self {
            package: config.package.clone(),
            entry_point: config.entry_point.clone(),
            runtime: config.runtime.clone(),
        }
    }
}

/// Why a handler binding did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TableMissing,
    RoleMissing,
    TableAndRoleMissing,
}

/// Outcome of [`ReplicatedTableProvisioner::bind_event_handler`].
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerBinding {
    Bound {
        function: ResourceRef,
        trigger: ResourceRef,
    },
    Skipped(SkipReason),
}

impl HandlerBinding {
    pub fn is_bound(&self) -> bool {
        matches!(self, HandlerBinding::Bound { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionRole {
    pub role: ResourceRef,
    /// Policy lookups, table policy first.
    pub policies: Vec<ResourceRef>,
}

#[derive(Debug, Clone)]
pub struct ReplicatedTable {
    pub table: ResourceRef,
    pub execution_role: ExecutionRole,
    pub handler: HandlerBinding,
}

pub struct ReplicatedTableProvisioner<'a, C: PolicyCatalog + ?Sized> {
    catalog: &'a C,
    handler: HandlerSpec,
    role_name: String,
}

impl<'a, C: PolicyCatalog + ?Sized> ReplicatedTableProvisioner<'a, C> {
    pub fn new(catalog: &'a C, handler: HandlerSpec) -> Self {
        Self {
            catalog,
            handler,
            role_name: "event-handler-execution-role".to_string(),
        }
    }

    pub fn with_role_name(mut self, name: impl Into<String>) -> Self {
        self.role_name = name.into();
        self
    }

    /// Declare the table, the execution role, and the stream handler.
    pub fn create(&self, graph: &mut ResourceGraph, spec: &TableSpec) -> SynthResult<ReplicatedTable> {
        spec.validate()?;

        let table = graph.add("replicated-table", Resource::DynamodbTable(spec.declaration()))?;
        info!(
            table = %spec.name,
            replicas = spec.replica_regions.len(),
            "replicated table declared"
        );

        let execution_role = self.grant_execution_role(graph)?;
        let handler = self.bind_event_handler(graph, Some(&table), Some(&execution_role.role))?;

        Ok(ReplicatedTable {
            table,
            execution_role,
            handler,
        })
    }

    /// Resolve both managed policies and declare a role the handler can
    /// assume with both attached. Fails with `PolicyNotFound` before
    /// declaring anything if either policy is unknown.
    pub fn grant_execution_role(&self, graph: &mut ResourceGraph) -> SynthResult<ExecutionRole> {
        let mut resolved = Vec::with_capacity(2);
        for name in [TABLE_POLICY, SEARCH_POLICY] {
            let arn = self
                .catalog
                .resolve(name)
                .ok_or_else(|| SynthError::PolicyNotFound {
                    name: name.to_string(),
                })?;
            resolved.push((name, arn));
        }

        let mut policies = Vec::with_capacity(resolved.len());
        for (name, arn) in resolved {
            let lookup = graph.add(
                format!("policy-{}", name.to_lowercase()),
                Resource::ManagedPolicyLookup(ManagedPolicyLookup {
                    name: name.to_string(),
                    arn,
                }),
            )?;
            debug!(policy = name, "managed policy resolved");
            policies.push(lookup);
        }

        let trust = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Principal": { "Service": HANDLER_PRINCIPAL },
                "Effect": "Allow",
                "Sid": "",
            }],
        });
        let role = graph.add(
            "handler-execution-role",
            Resource::IamRole(IamRole {
                name: self.role_name.clone(),
                assume_role_policy: serde_json::to_string(&trust)?,
                managed_policy_arns: policies.iter().map(ResourceRef::arn).collect(),
            }),
        )?;
        info!(role = %self.role_name, "execution role granted");

        Ok(ExecutionRole { role, policies })
    }

    /// Declare the stream handler, but only when both the table and the
    /// role are present. A missing prerequisite is a skip, not an error.
    pub fn bind_event_handler(
        &self,
        graph: &mut ResourceGraph,
        table: Option<&ResourceRef>,
        role: Option<&ResourceRef>,
    ) -> SynthResult<HandlerBinding> {
        let (table, role) = match (table, role) {
            (Some(t), Some(r)) => (t, r),
            (None, Some(_)) => return Ok(skip(SkipReason::TableMissing)),
            (Some(_), None) => return Ok(skip(SkipReason::RoleMissing)),
            (None, None) => return Ok(skip(SkipReason::TableAndRoleMissing)),
        };

        let table_name = match graph.node(table).map(Node::resource) {
            Some(Resource::DynamodbTable(t)) => t.name.clone(),
            _ => {
                return Err(SynthError::missing(
                    "aws_lambda_function.table-event-handler",
                    table.to_string(),
                ));
            }
        };

        let function = graph.add_with_deps(
            "table-event-handler",
            Resource::LambdaFunction(LambdaFunction {
                function_name: format!("{table_name}-event-handler"),
                role: role.arn(),
                filename: self.handler.package.clone(),
                handler: self.handler.entry_point.clone(),
                runtime: self.handler.runtime.clone(),
            }),
            &[table, role],
        )?;
        let trigger = graph.add(
            "table-event-handler-trigger",
            Resource::EventSourceMapping(EventSourceMapping {
                event_source_arn: table.attr("stream_arn"),
                function_name: function.arn(),
                starting_position: "LATEST".to_string(),
            }),
        )?;
        info!(function = %function, "event handler bound");

        Ok(HandlerBinding::Bound { function, trigger })
    }
}

fn skip(reason: SkipReason) -> HandlerBinding {
    warn!(?reason, "event handler binding skipped");
    HandlerBinding::Skipped(reason)
}
