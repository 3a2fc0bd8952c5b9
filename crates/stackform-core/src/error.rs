//! Synthesis error types.

use thiserror::Error;

/// Result type alias for synthesis operations.
pub type SynthResult<T> = Result<T, SynthError>;

/// Errors that abort topology synthesis.
///
/// None of these are retried. A failed synthesis drops the partially
/// built graph, so nothing is handed to the provisioning engine.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("invalid address allocation for index {index}: {reason}")]
    InvalidAllocation { index: i64, reason: String },

    #[error("managed policy not found: {name}")]
    PolicyNotFound { name: String },

    #[error("{resource} requires {missing}, which has not been declared")]
    DependencyMissing { resource: String, missing: String },

    #[error("invalid configuration for `{field}`: {reason}")]
    ConfigurationInvalid { field: String, reason: String },

    #[error("resource declared twice: {0}")]
    DuplicateResource(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to render manifest: {0}")]
    Render(#[from] serde_json::Error),

    #[error("invalid identifier pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SynthError::ConfigurationInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(resource: impl Into<String>, missing: impl Into<String>) -> Self {
        SynthError::DependencyMissing {
            resource: resource.into(),
            missing: missing.into(),
        }
    }
}
