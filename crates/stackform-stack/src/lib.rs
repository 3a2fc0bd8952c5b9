//! stackform-stack: whole-topology synthesis.
//!
//! Runs every provisioner against one configuration and returns either a
//! complete [`Stack`] or the first error. The dependency chain is:
//!
//! ```text
//! Stack
//!   ├── network ──► search cluster ──► storage alarm
//!   └── replicated table ──► execution role ──► stream handler
//! ```
//!
//! The two branches share no declarations, so an engine may realize
//! them concurrently.

pub mod stack;

pub use stack::{Stack, synthesize, synthesize_with};
