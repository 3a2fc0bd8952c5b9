//! stackform-core: shared vocabulary for topology synthesis.
//!
//! Everything the provisioners exchange lives here: the configuration
//! file format, the typed resource declarations, the dependency graph
//! those declarations are collected into, and the rendered manifest a
//! provisioning engine consumes.
//!
//! # Components
//!
//! - **`cidr`**: IPv4 CIDR block value type
//! - **`config`**: `stackform.toml` parsing, defaults, and validation
//! - **`types`**: Resource declarations and cross-resource references
//! - **`graph`**: Insertion-ordered dependency graph with ordering queries
//! - **`manifest`**: Serializable, fingerprinted rendering of a graph
//! - **`error`**: The synthesis error taxonomy

pub mod cidr;
pub mod config;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod types;

pub use cidr::Cidr;
pub use config::TopologyConfig;
pub use error::{SynthError, SynthResult};
pub use graph::{Node, ResourceGraph};
pub use manifest::{Manifest, ManifestResource, ResourceMode};
pub use types::*;
