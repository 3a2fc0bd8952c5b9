//! Managed-policy resolution.

use std::collections::{BTreeMap, BTreeSet};

/// Looks up pre-existing managed policies by name.
pub trait PolicyCatalog {
    /// ARN of the policy called `name`, or `None` if it does not exist.
    fn resolve(&self, name: &str) -> Option<String>;
}

/// AWS-managed policies, which live under `arn:aws:iam::aws:policy/`.
#[derive(Debug, Clone)]
pub struct AwsManagedPolicies {
    known: BTreeSet<String>,
}

const BUILTIN: &[&str] = &[
    "AmazonDynamoDBFullAccess",
    "AmazonDynamoDBReadOnlyAccess",
    "AmazonOpenSearchServiceFullAccess",
    "AmazonOpenSearchServiceReadOnlyAccess",
    "AWSLambdaBasicExecutionRole",
    "AWSLambdaDynamoDBExecutionRole",
    "CloudWatchFullAccess",
];

impl AwsManagedPolicies {
    pub fn new() -> Self {
        Self {
            known: BUILTIN.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add names known to exist in the target account.
    pub fn with_extra<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(names.into_iter().map(Into::into));
        self
    }

    /// A catalog that knows nothing.
    pub fn empty() -> Self {
        Self {
            known: BTreeSet::new(),
        }
    }
}

impl Default for AwsManagedPolicies {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyCatalog for AwsManagedPolicies {
    fn resolve(&self, name: &str) -> Option<String> {
        self.known
            .contains(name)
            .then(|| format!("arn:aws:iam::aws:policy/{name}"))
    }
}

/// Explicit name → ARN table.
impl PolicyCatalog for BTreeMap<String, String> {
    fn resolve(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
