//! Stackform search cluster: zone-aware sizing and storage alarm.
//!
//! # Components
//!
//! - **`cluster`**: Sizing defaults and the managed domain declaration
//! - **`alarm`**: Free-storage threshold and alarm declaration

pub mod alarm;
pub mod cluster;

pub use alarm::{AlarmSpec, AlarmThresholdDeriver, DEFAULT_COEFFICIENT, derive_threshold};
pub use cluster::{ClusterSizing, SearchCluster, SearchClusterProvisioner, SearchDomainSpec, StorageSpec};
