//! Storage-low alarm.
//!
//! The threshold is a fixed fraction of the volume the cluster was
//! actually provisioned with. Every evaluation period in the window must
//! breach (`datapoints_to_alarm == evaluation_periods`), and periods with
//! no data never count as breaching.

use std::collections::BTreeMap;

use tracing::info;

use stackform_core::config::{AlarmConfig, DimensionSource};
use stackform_core::*;

use crate::cluster::SearchCluster;

/// Fraction of provisioned storage that triggers the alarm.
pub const DEFAULT_COEFFICIENT: f64 = 0.30;

const COMPARISON_OPERATOR: &str = "LessThanOrEqualToThreshold";
const DIMENSION: &str = "DomainName";

/// `coefficient × volume_size`.
pub fn derive_threshold(volume_size: u32, coefficient: f64) -> SynthResult<f64> {
    if volume_size == 0 {
        return Err(SynthError::config("search.volume_size", "must be positive"));
    }
    if !coefficient.is_finite() || coefficient <= 0.0 || coefficient > 1.0 {
        return Err(SynthError::config(
            "alarm.coefficient",
            format!("{coefficient} must lie in (0, 1]"),
        ));
    }
    Ok(coefficient * f64::from(volume_size))
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSpec {
    pub alarm_name: String,
    pub metric_name: String,
    pub namespace: String,
    pub statistic: String,
    pub comparison_operator: String,
    pub threshold: f64,
    pub evaluation_periods: u32,
    pub datapoints_to_alarm: u32,
    pub period_secs: u32,
    pub description: String,
    pub missing_data: MissingDataPolicy,
    pub dimension: Value,
}

pub struct AlarmThresholdDeriver {
    config: AlarmConfig,
    prefix: String,
    environment: String,
}

impl AlarmThresholdDeriver {
    pub fn new(config: AlarmConfig, prefix: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            config,
            prefix: prefix.into(),
            environment: environment.into(),
        }
    }

    /// Build the alarm for `cluster` without declaring it.
    pub fn derive(&self, cluster: &SearchCluster) -> SynthResult<AlarmSpec> {
        if self.config.evaluation_periods == 0 {
            return Err(SynthError::config("alarm.evaluation_periods", "must be positive"));
        }
        let threshold = derive_threshold(cluster.volume_size, self.config.coefficient)?;
        let dimension = match self.config.dimension_source {
            DimensionSource::Cluster => Value::Ref(cluster.domain.attr("domain_name")),
            DimensionSource::Config => Value::Literal(cluster.domain_name.clone()),
        };

        Ok(AlarmSpec {
            alarm_name: format!(
                "{}-ElasticSearch-FreeStorageSpaceTooLow-{}",
                self.prefix, self.environment
            ),
            metric_name: self.config.metric_name.clone(),
            namespace: self.config.namespace.clone(),
            statistic: self.config.statistic.clone(),
            comparison_operator: COMPARISON_OPERATOR.to_string(),
            threshold,
            evaluation_periods: self.config.evaluation_periods,
            datapoints_to_alarm: self.config.evaluation_periods,
            period_secs: self.config.period_secs,
            description: self.config.description.clone(),
            missing_data: self.config.treat_missing_data,
            dimension,
        })
    }

    /// Declare the alarm strictly downstream of the cluster.
    pub fn declare(&self, graph: &mut ResourceGraph, cluster: &SearchCluster) -> SynthResult<ResourceRef> {
        let spec = self.derive(cluster)?;
        let alarm = graph.add_with_deps(
            "storage-low-alarm",
            Resource::MetricAlarm(MetricAlarm {
                alarm_name: spec.alarm_name,
                comparison_operator: spec.comparison_operator,
                evaluation_periods: spec.evaluation_periods,
                datapoints_to_alarm: spec.datapoints_to_alarm,
                metric_name: spec.metric_name,
                namespace: spec.namespace,
                period: spec.period_secs,
                statistic: spec.statistic,
                threshold: spec.threshold,
                alarm_description: spec.description,
                treat_missing_data: spec.missing_data,
                dimensions: BTreeMap::from([(DIMENSION.to_string(), spec.dimension)]),
            }),
            &[&cluster.domain],
        )?;
        info!(alarm = %alarm, threshold = spec.threshold, "storage alarm declared");
        Ok(alarm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(graph: &mut ResourceGraph, volume_size: u32) -> SearchCluster {
        // Any declared node stands in for the domain here.
        let domain = graph
            .add(
                "search-domain",
                Resource::Eip(Eip {
                    domain: "vpc".to_string(),
                    tags: Tags::new(),
                }),
            )
            .unwrap();
        SearchCluster {
            domain,
            domain_name: "production-opensearch".to_string(),
            volume_size,
        }
    }

    fn alarm_of<'a>(graph: &'a ResourceGraph, r: &ResourceRef) -> &'a MetricAlarm {
        match graph.node(r).unwrap().resource() {
            Resource::MetricAlarm(a) => a,
            other => panic!("expected alarm, got {:?}", other.kind()),
        }
    }

    #[test]
    fn thirty_percent_of_ten() {
        assert_eq!(derive_threshold(10, 0.30).unwrap(), 3.0);
        assert_eq!(derive_threshold(100, DEFAULT_COEFFICIENT).unwrap(), 30.0);
    }

    #[test]
    fn threshold_inputs_validated() {
        assert!(derive_threshold(0, 0.30).is_err());
        assert!(derive_threshold(10, 0.0).is_err());
        assert!(derive_threshold(10, 1.01).is_err());
        assert_eq!(derive_threshold(10, 1.0).unwrap(), 10.0);
    }

    #[test]
    fn every_period_must_breach() {
        let mut graph = ResourceGraph::new();
        let cluster = cluster(&mut graph, 10);
        let deriver = AlarmThresholdDeriver::new(AlarmConfig::default(), "production-opensearch", "prod");
        let spec = deriver.derive(&cluster).unwrap();

        assert_eq!(spec.evaluation_periods, 10);
        assert_eq!(spec.datapoints_to_alarm, spec.evaluation_periods);
        assert_eq!(spec.missing_data, MissingDataPolicy::Ignore);
        assert_eq!(spec.comparison_operator, "LessThanOrEqualToThreshold");
        assert_eq!(spec.threshold, 3.0);
        assert_eq!(
            spec.alarm_name,
            "production-opensearch-ElasticSearch-FreeStorageSpaceTooLow-prod"
        );
    }

    #[test]
    fn dimension_references_cluster_by_default() {
        let mut graph = ResourceGraph::new();
        let cluster = cluster(&mut graph, 20);
        let deriver = AlarmThresholdDeriver::new(AlarmConfig::default(), "p", "prod");
        let alarm = deriver.declare(&mut graph, &cluster).unwrap();

        let declared = alarm_of(&graph, &alarm);
        assert_eq!(
            declared.dimensions.get("DomainName"),
            Some(&Value::Ref(cluster.domain.attr("domain_name")))
        );
        assert_eq!(declared.threshold, 6.0);
        assert!(graph.depends_on(&alarm, &cluster.domain));
    }

    #[test]
    fn configured_dimension_still_downstream() {
        let mut graph = ResourceGraph::new();
        let cluster = cluster(&mut graph, 10);
        let config = AlarmConfig {
            dimension_source: DimensionSource::Config,
            ..AlarmConfig::default()
        };
        let alarm = AlarmThresholdDeriver::new(config, "p", "prod")
            .declare(&mut graph, &cluster)
            .unwrap();

        let declared = alarm_of(&graph, &alarm);
        assert_eq!(
            declared.dimensions.get("DomainName"),
            Some(&Value::Literal("production-opensearch".to_string()))
        );
        let node = graph.node(&alarm).unwrap();
        assert!(node.explicit_depends_on().contains(cluster.domain.id()));

        let json = serde_json::to_value(declared).unwrap();
        assert_eq!(json["treat_missing_data"], "ignore");
        assert_eq!(json["dimensions"]["DomainName"], "production-opensearch");
    }

    #[test]
    fn zero_periods_rejected() {
        let mut graph = ResourceGraph::new();
        let cluster = cluster(&mut graph, 10);
        let config = AlarmConfig {
            evaluation_periods: 0,
            ..AlarmConfig::default()
        };
        assert!(AlarmThresholdDeriver::new(config, "p", "prod").derive(&cluster).is_err());
    }
}
