//! stackform.toml configuration parser.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cidr::Cidr;
use crate::error::{SynthError, SynthResult};
use crate::types::{BillingMode, MissingDataPolicy, ScalarType, StreamViewType, TableClass};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub stack: StackConfig,
    pub provider: ProviderConfig,
    pub backend: Option<BackendConfig>,
    pub network: NetworkConfig,
    pub search: SearchConfig,
    pub table: TableConfig,
    #[serde(default)]
    pub handler: HandlerConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub policies: PoliciesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    pub name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Provider settings, passed through to the engine untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub region: String,
    pub assume_role: Option<AssumeRoleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssumeRoleConfig {
    pub role_arn: String,
    pub session_name: String,
    pub duration: Option<String>,
}

/// Remote state backend, passed through to the engine untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub bucket: String,
    pub key: String,
    pub region: String,
    pub role_arn: Option<String>,
    pub session_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_vpc_cidr")]
    pub cidr_block: Cidr,
    #[serde(default = "default_subnet_prefix")]
    pub subnet_prefix: u8,
    pub availability_zones: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub domain_name: String,
    #[serde(default = "default_engine_version")]
    pub engine_version: String,
    #[serde(default = "default_search_instance_type")]
    pub instance_type: String,
    #[serde(default = "default_search_instance_type")]
    pub dedicated_master_type: String,
    #[serde(default = "default_true")]
    pub dedicated_master_enabled: bool,
    /// Data-node count override. Defaults to the zone count.
    pub instance_count: Option<u32>,
    /// Dedicated-master count override. Defaults to the zone count.
    pub dedicated_master_count: Option<u32>,
    /// EBS volume size per data node, in GiB.
    pub volume_size: u32,
    #[serde(default = "default_volume_type")]
    pub volume_type: String,
    pub encrypt_at_rest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub scalar: ScalarType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    #[serde(default = "default_billing_mode")]
    pub billing_mode: BillingMode,
    pub hash_key: KeyConfig,
    pub range_key: KeyConfig,
    pub replica_regions: Vec<String>,
    #[serde(default = "default_stream_view_type")]
    pub stream_view_type: StreamViewType,
    #[serde(default = "default_table_class")]
    pub table_class: TableClass,
}

/// The stream handler's package. Its code is opaque to synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    pub package: String,
    pub entry_point: String,
    pub runtime: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            package: "../lambda_function.py".to_string(),
            entry_point: "lambda_function.lambda_handler".to_string(),
            runtime: "python3.8".to_string(),
        }
    }
}

/// Where the alarm's `DomainName` dimension comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionSource {
    /// The provisioned domain's own `domain_name` attribute.
    Cluster,
    /// The configured `search.domain_name` string.
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Alarm name prefix. Falls back to the search domain name.
    pub prefix: Option<String>,
    /// Fraction of provisioned storage below which the alarm fires.
    pub coefficient: f64,
    /// Consecutive breaching periods required; also the datapoint count.
    pub evaluation_periods: u32,
    pub period_secs: u32,
    pub metric_name: String,
    pub namespace: String,
    pub statistic: String,
    pub description: String,
    pub treat_missing_data: MissingDataPolicy,
    pub dimension_source: DimensionSource,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            coefficient: 0.30,
            evaluation_periods: 10,
            period_secs: 60,
            metric_name: "FreeStorageSpace".to_string(),
            namespace: "AWS/ES".to_string(),
            statistic: "Minimum".to_string(),
            description: "Minimum free disk space is too low".to_string(),
            treat_missing_data: MissingDataPolicy::Ignore,
            dimension_source: DimensionSource::Cluster,
        }
    }
}

/// Managed policies known to exist in the target account beyond the
/// built-in AWS-managed set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoliciesConfig {
    #[serde(default)]
    pub extra_managed: Vec<String>,
}

fn default_environment() -> String {
    "prod".to_string()
}

fn default_vpc_cidr() -> Cidr {
    Cidr::DEFAULT_VPC
}

fn default_subnet_prefix() -> u8 {
    24
}

fn default_engine_version() -> String {
    "OpenSearch_1.3".to_string()
}

fn default_search_instance_type() -> String {
    "t3.small.search".to_string()
}

fn default_true() -> bool {
    true
}

fn default_volume_type() -> String {
    "gp2".to_string()
}

fn default_billing_mode() -> BillingMode {
    BillingMode::PayPerRequest
}

fn default_stream_view_type() -> StreamViewType {
    StreamViewType::NewAndOldImages
}

fn default_table_class() -> TableClass {
    TableClass::Standard
}

/// Highest subnet prefix accepted; AWS rejects anything smaller than /28.
const MAX_SUBNET_PREFIX: u8 = 28;

impl TopologyConfig {
    pub fn from_file(path: &Path) -> SynthResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> SynthResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> SynthResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Alarm name prefix, defaulting to the domain name.
    pub fn alarm_prefix(&self) -> &str {
        self.alarm
            .prefix
            .as_deref()
            .unwrap_or(&self.search.domain_name)
    }

    /// Number of subnet blocks the VPC range can hand out (index 0 excluded).
    pub fn subnet_capacity(&self) -> u64 {
        let bits = u32::from(self.network.subnet_prefix.saturating_sub(self.network.cidr_block.prefix()));
        (1u64 << bits.min(32)) - 1
    }

    /// Scaffold the reference deployment: three zones in us-east-1, a
    /// small search domain, and a two-region replicated table.
    pub fn scaffold(name: &str) -> Self {
        TopologyConfig {
            stack: StackConfig {
                name: name.to_string(),
                environment: default_environment(),
            },
            provider: ProviderConfig {
                region: "us-east-1".to_string(),
                assume_role: None,
            },
            backend: None,
            network: NetworkConfig {
                cidr_block: default_vpc_cidr(),
                subnet_prefix: default_subnet_prefix(),
                availability_zones: vec![
                    "us-east-1a".to_string(),
                    "us-east-1b".to_string(),
                    "us-east-1f".to_string(),
                ],
                tags: BTreeMap::from([
                    ("Name".to_string(), "Open search".to_string()),
                    ("Team".to_string(), "Solution architects".to_string()),
                ]),
            },
            search: SearchConfig {
                domain_name: "production-opensearch".to_string(),
                engine_version: default_engine_version(),
                instance_type: default_search_instance_type(),
                dedicated_master_type: default_search_instance_type(),
                dedicated_master_enabled: true,
                instance_count: None,
                dedicated_master_count: None,
                volume_size: 10,
                volume_type: default_volume_type(),
                encrypt_at_rest: false,
            },
            table: TableConfig {
                name: "opensearch-global-tables".to_string(),
                billing_mode: default_billing_mode(),
                hash_key: KeyConfig {
                    name: "userId".to_string(),
                    scalar: ScalarType::Number,
                },
                range_key: KeyConfig {
                    name: "score".to_string(),
                    scalar: ScalarType::Number,
                },
                replica_regions: vec!["us-east-1".to_string(), "us-west-1".to_string()],
                stream_view_type: default_stream_view_type(),
                table_class: default_table_class(),
            },
            handler: HandlerConfig::default(),
            alarm: AlarmConfig::default(),
            policies: PoliciesConfig::default(),
        }
    }

    /// Check every field synthesis relies on. The first violation wins.
    pub fn validate(&self) -> SynthResult<()> {
        let region_re = Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-\d+$")?;
        let zone_re = Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-\d+[a-z]$")?;
        let domain_re = Regex::new(r"^[a-z][a-z0-9\-]{2,27}$")?;

        if self.stack.name.trim().is_empty() {
            return Err(SynthError::config("stack.name", "must not be empty"));
        }
        if !region_re.is_match(&self.provider.region) {
            return Err(SynthError::config(
                "provider.region",
                format!("`{}` is not a region identifier", self.provider.region),
            ));
        }

        self.validate_network(&zone_re)?;
        self.validate_search(&domain_re)?;
        self.validate_table(&region_re)?;
        self.validate_alarm()
    }

    fn validate_network(&self, zone_re: &Regex) -> SynthResult<()> {
        let zones = &self.network.availability_zones;
        if zones.is_empty() {
            return Err(SynthError::config(
                "network.availability_zones",
                "at least one availability zone is required",
            ));
        }
        let mut seen = HashSet::new();
        for (ordinal, zone) in zones.iter().enumerate() {
            let field = format!("network.availability_zones[{ordinal}]");
            if !zone_re.is_match(zone) {
                return Err(SynthError::config(field, format!("`{zone}` is not a zone identifier")));
            }
            if !zone.starts_with(&self.provider.region) {
                return Err(SynthError::config(
                    field,
                    format!("`{zone}` is not in region {}", self.provider.region),
                ));
            }
            if !seen.insert(zone.as_str()) {
                return Err(SynthError::config(field, format!("`{zone}` is listed twice")));
            }
        }

        let prefix = self.network.subnet_prefix;
        if prefix < self.network.cidr_block.prefix() || prefix > MAX_SUBNET_PREFIX {
            return Err(SynthError::config(
                "network.subnet_prefix",
                format!(
                    "/{prefix} must lie between /{} and /{MAX_SUBNET_PREFIX}",
                    self.network.cidr_block.prefix()
                ),
            ));
        }
        let needed = 2 * zones.len() as u64;
        if needed > self.subnet_capacity() {
            return Err(SynthError::config(
                "network.availability_zones",
                format!(
                    "{} zones need {needed} subnets but {} holds only {}",
                    zones.len(),
                    self.network.cidr_block,
                    self.subnet_capacity()
                ),
            ));
        }
        Ok(())
    }

    fn validate_search(&self, domain_re: &Regex) -> SynthResult<()> {
        let search = &self.search;
        if !domain_re.is_match(&search.domain_name) {
            return Err(SynthError::config(
                "search.domain_name",
                format!("`{}` is not a valid domain name", search.domain_name),
            ));
        }
        if search.instance_count == Some(0) {
            return Err(SynthError::config("search.instance_count", "must be positive"));
        }
        if search.dedicated_master_count == Some(0) {
            return Err(SynthError::config("search.dedicated_master_count", "must be positive"));
        }
        if search.volume_size == 0 {
            return Err(SynthError::config("search.volume_size", "must be positive"));
        }
        Ok(())
    }

    fn validate_table(&self, region_re: &Regex) -> SynthResult<()> {
        let table = &self.table;
        if table.name.trim().is_empty() {
            return Err(SynthError::config("table.name", "must not be empty"));
        }
        if table.hash_key.name.is_empty() || table.range_key.name.is_empty() {
            return Err(SynthError::config("table.hash_key", "key names must not be empty"));
        }
        if table.hash_key.name == table.range_key.name {
            return Err(SynthError::config(
                "table.range_key",
                format!("`{}` is already the hash key", table.range_key.name),
            ));
        }
        if table.replica_regions.is_empty() {
            return Err(SynthError::config(
                "table.replica_regions",
                "at least one replica region is required",
            ));
        }
        let mut seen = HashSet::new();
        for (ordinal, region) in table.replica_regions.iter().enumerate() {
            let field = format!("table.replica_regions[{ordinal}]");
            if !region_re.is_match(region) {
                return Err(SynthError::config(field, format!("`{region}` is not a region identifier")));
            }
            if !seen.insert(region.as_str()) {
                return Err(SynthError::config(field, format!("`{region}` is listed twice")));
            }
        }
        Ok(())
    }

    fn validate_alarm(&self) -> SynthResult<()> {
        let c = self.alarm.coefficient;
        if !c.is_finite() || c <= 0.0 || c > 1.0 {
            return Err(SynthError::config(
                "alarm.coefficient",
                format!("{c} must lie in (0, 1]"),
            ));
        }
        if self.alarm.evaluation_periods == 0 {
            return Err(SynthError::config("alarm.evaluation_periods", "must be positive"));
        }
        if self.alarm.period_secs == 0 {
            return Err(SynthError::config("alarm.period_secs", "must be positive"));
        }
        Ok(())
    }
}
