//! Resource declarations shared across Stackform crates.
//!
//! A declaration describes the desired shape of one cloud object. Values
//! that only exist once another object is realized (an id, an ARN) are
//! expressed as [`Reference`]s, and every reference doubles as a
//! dependency edge in the [`ResourceGraph`](crate::ResourceGraph).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::cidr::Cidr;

/// Tag set attached to taggable declarations.
pub type Tags = BTreeMap<String, String>;

// ── Identity ───────────────────────────────────────────────────────

/// Logical identifier of a declaration, unique within one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The provider type of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Vpc,
    InternetGateway,
    Subnet,
    Eip,
    NatGateway,
    RouteTable,
    Route,
    RouteTableAssociation,
    SecurityGroup,
    SecurityGroupRule,
    ManagedPolicyLookup,
    IamRole,
    DynamodbTable,
    LambdaFunction,
    EventSourceMapping,
    SearchDomain,
    MetricAlarm,
}

impl ResourceKind {
    /// Provider type name as the provisioning engine spells it.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "aws_vpc",
            ResourceKind::InternetGateway => "aws_internet_gateway",
            ResourceKind::Subnet => "aws_subnet",
            ResourceKind::Eip => "aws_eip",
            ResourceKind::NatGateway => "aws_nat_gateway",
            ResourceKind::RouteTable => "aws_route_table",
            ResourceKind::Route => "aws_route",
            ResourceKind::RouteTableAssociation => "aws_route_table_association",
            ResourceKind::SecurityGroup => "aws_security_group",
            ResourceKind::SecurityGroupRule => "aws_security_group_rule",
            ResourceKind::ManagedPolicyLookup => "data.aws_iam_policy",
            ResourceKind::IamRole => "aws_iam_role",
            ResourceKind::DynamodbTable => "aws_dynamodb_table",
            ResourceKind::LambdaFunction => "aws_lambda_function",
            ResourceKind::EventSourceMapping => "aws_lambda_event_source_mapping",
            ResourceKind::SearchDomain => "aws_opensearch_domain",
            ResourceKind::MetricAlarm => "aws_cloudwatch_metric_alarm",
        }
    }

    /// Data sources are read, never created.
    pub fn is_data_source(&self) -> bool {
        matches!(self, ResourceKind::ManagedPolicyLookup)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.type_name())
    }
}

/// Handle to a declaration already present in a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    kind: ResourceKind,
    id: ResourceId,
}

impl ResourceRef {
    pub(crate) fn new(kind: ResourceKind, id: ResourceId) -> Self {
        Self { kind, id }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Reference to an attribute the engine fills in on realization.
    pub fn attr(&self, attribute: &str) -> Reference {
        Reference {
            target: self.clone(),
            attribute: attribute.to_string(),
        }
    }

    pub fn id_attr(&self) -> Reference {
        self.attr("id")
    }

    pub fn arn(&self) -> Reference {
        self.attr("arn")
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.id)
    }
}

/// A late-bound attribute of another declaration, rendered `${kind.id.attr}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    target: ResourceRef,
    attribute: String,
}

impl Reference {
    pub fn target(&self) -> &ResourceRef {
        &self.target
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.target, self.attribute)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Either a literal or a late-bound reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Literal(String),
    Ref(Reference),
}

/// Value of a named stack output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    One(Reference),
    Many(Vec<Reference>),
    Map(BTreeMap<String, OutputValue>),
}

impl OutputValue {
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            OutputValue::One(r) => vec![r],
            OutputValue::Many(refs) => refs.iter().collect(),
            OutputValue::Map(map) => map.values().flat_map(|v| v.references()).collect(),
        }
    }
}

// ── Enumerations ───────────────────────────────────────────────────

/// Whether a subnet or route table faces the internet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    /// Allocation pass: private subnets are numbered before public ones.
    pub fn pass(&self) -> u32 {
        match self {
            Visibility::Private => 0,
            Visibility::Public => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }
}

/// Key attribute scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    #[serde(rename = "S")]
    String,
    #[serde(rename = "N")]
    Number,
    #[serde(rename = "B")]
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamViewType {
    KeysOnly,
    NewImage,
    OldImage,
    NewAndOldImages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingMode {
    PayPerRequest,
    Provisioned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableClass {
    Standard,
    StandardInfrequentAccess,
}

/// How an alarm treats periods with no datapoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingDataPolicy {
    Ignore,
    Missing,
    Breaching,
    NotBreaching,
}

// ── Network ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vpc {
    pub cidr_block: Cidr,
    pub enable_dns_hostnames: bool,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternetGateway {
    pub vpc_id: Reference,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subnet {
    pub vpc_id: Reference,
    pub availability_zone: String,
    pub cidr_block: Cidr,
    pub map_public_ip_on_launch: bool,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Eip {
    pub domain: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NatGateway {
    pub allocation_id: Reference,
    pub subnet_id: Reference,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteTable {
    pub vpc_id: Reference,
    pub tags: Tags,
}

/// Where a route sends matching traffic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    GatewayId(Reference),
    NatGatewayId(Reference),
}

impl RouteTarget {
    pub fn reference(&self) -> &Reference {
        match self {
            RouteTarget::GatewayId(r) | RouteTarget::NatGatewayId(r) => r,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub route_table_id: Reference,
    pub destination_cidr_block: Cidr,
    #[serde(flatten)]
    pub target: RouteTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteTableAssociation {
    pub route_table_id: Reference,
    pub subnet_id: Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityGroup {
    pub name: String,
    pub vpc_id: Reference,
    pub tags: Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleDirection {
    Ingress,
    Egress,
}

/// The other side of a security group rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePeer {
    SourceSecurityGroupId(Reference),
    CidrBlocks(Vec<Cidr>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityGroupRule {
    pub security_group_id: Reference,
    #[serde(rename = "type")]
    pub direction: RuleDirection,
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    #[serde(flatten)]
    pub peer: RulePeer,
}

// ── Identity and access ────────────────────────────────────────────

/// Read-only lookup of a pre-existing managed policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagedPolicyLookup {
    pub name: String,
    /// ARN the policy resolved to at synthesis time.
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IamRole {
    pub name: String,
    /// Trust policy document, JSON-encoded.
    pub assume_role_policy: String,
    pub managed_policy_arns: Vec<Reference>,
}

// ── Data services ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub scalar: ScalarType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replica {
    pub region_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamodbTable {
    pub name: String,
    pub billing_mode: BillingMode,
    pub hash_key: String,
    pub range_key: String,
    pub attribute: Vec<AttributeDefinition>,
    pub replica: Vec<Replica>,
    pub stream_enabled: bool,
    pub stream_view_type: StreamViewType,
    pub table_class: TableClass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LambdaFunction {
    pub function_name: String,
    pub role: Reference,
    pub filename: String,
    pub handler: String,
    pub runtime: String,
}

/// Feeds a table's change stream into a function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSourceMapping {
    pub event_source_arn: Reference,
    pub function_name: Reference,
    pub starting_position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneAwarenessConfig {
    pub availability_zone_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterConfig {
    pub dedicated_master_enabled: bool,
    pub dedicated_master_type: String,
    pub dedicated_master_count: u32,
    pub instance_type: String,
    pub instance_count: u32,
    pub zone_awareness_enabled: bool,
    pub zone_awareness_config: ZoneAwarenessConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EbsOptions {
    pub ebs_enabled: bool,
    pub volume_size: u32,
    pub volume_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncryptAtRest {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VpcOptions {
    pub subnet_ids: Vec<Reference>,
    pub security_group_ids: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDomain {
    pub domain_name: String,
    pub engine_version: String,
    pub cluster_config: ClusterConfig,
    pub ebs_options: EbsOptions,
    pub encrypt_at_rest: EncryptAtRest,
    pub vpc_options: VpcOptions,
    pub tags: Tags,
}

// ── Monitoring ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricAlarm {
    pub alarm_name: String,
    pub comparison_operator: String,
    pub evaluation_periods: u32,
    pub datapoints_to_alarm: u32,
    pub metric_name: String,
    pub namespace: String,
    pub period: u32,
    pub statistic: String,
    pub threshold: f64,
    pub alarm_description: String,
    pub treat_missing_data: MissingDataPolicy,
    pub dimensions: BTreeMap<String, Value>,
}

// ── Declaration ────────────────────────────────────────────────────

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    Vpc(Vpc),
    InternetGateway(InternetGateway),
    Subnet(Subnet),
    Eip(Eip),
    NatGateway(NatGateway),
    RouteTable(RouteTable),
    Route(Route),
    RouteTableAssociation(RouteTableAssociation),
    SecurityGroup(SecurityGroup),
    SecurityGroupRule(SecurityGroupRule),
    ManagedPolicyLookup(ManagedPolicyLookup),
    IamRole(IamRole),
    DynamodbTable(DynamodbTable),
    LambdaFunction(LambdaFunction),
    EventSourceMapping(EventSourceMapping),
    SearchDomain(SearchDomain),
    MetricAlarm(MetricAlarm),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Vpc(_) => ResourceKind::Vpc,
            Resource::InternetGateway(_) => ResourceKind::InternetGateway,
            Resource::Subnet(_) => ResourceKind::Subnet,
            Resource::Eip(_) => ResourceKind::Eip,
            Resource::NatGateway(_) => ResourceKind::NatGateway,
            Resource::RouteTable(_) => ResourceKind::RouteTable,
            Resource::Route(_) => ResourceKind::Route,
            Resource::RouteTableAssociation(_) => ResourceKind::RouteTableAssociation,
            Resource::SecurityGroup(_) => ResourceKind::SecurityGroup,
            Resource::SecurityGroupRule(_) => ResourceKind::SecurityGroupRule,
            Resource::ManagedPolicyLookup(_) => ResourceKind::ManagedPolicyLookup,
            Resource::IamRole(_) => ResourceKind::IamRole,
            Resource::DynamodbTable(_) => ResourceKind::DynamodbTable,
            Resource::LambdaFunction(_) => ResourceKind::LambdaFunction,
            Resource::EventSourceMapping(_) => ResourceKind::EventSourceMapping,
            Resource::SearchDomain(_) => ResourceKind::SearchDomain,
            Resource::MetricAlarm(_) => ResourceKind::MetricAlarm,
        }
    }

    /// Every late-bound value this declaration reads.
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            Resource::Vpc(_)
            | Resource::Eip(_)
            | Resource::ManagedPolicyLookup(_)
            | Resource::DynamodbTable(_) => Vec::new(),
            Resource::InternetGateway(r) => vec![&r.vpc_id],
            Resource::Subnet(r) => vec![&r.vpc_id],
            Resource::NatGateway(r) => vec![&r.allocation_id, &r.subnet_id],
            Resource::RouteTable(r) => vec![&r.vpc_id],
            Resource::Route(r) => vec![&r.route_table_id, r.target.reference()],
            Resource::RouteTableAssociation(r) => vec![&r.route_table_id, &r.subnet_id],
            Resource::SecurityGroup(r) => vec![&r.vpc_id],
            Resource::SecurityGroupRule(r) => {
                let mut refs = vec![&r.security_group_id];
                if let RulePeer::SourceSecurityGroupId(source) = &r.peer {
                    refs.push(source);
                }
                refs
            }
            Resource::IamRole(r) => r.managed_policy_arns.iter().collect(),
            Resource::LambdaFunction(r) => vec![&r.role],
            Resource::EventSourceMapping(r) => vec![&r.event_source_arn, &r.function_name],
            Resource::SearchDomain(r) => r
                .vpc_options
                .subnet_ids
                .iter()
                .chain(r.vpc_options.security_group_ids.iter())
                .collect(),
            Resource::MetricAlarm(r) => r
                .dimensions
                .values()
                .filter_map(|v| match v {
                    Value::Ref(r) => Some(r),
                    Value::Literal(_) => None,
                })
                .collect(),
        }
    }
}
