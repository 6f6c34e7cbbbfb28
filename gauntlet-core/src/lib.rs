//! # gauntlet-core
//!
//! Foundation crate for the Gauntlet test orchestrator.
//! Defines all types, traits, errors, config, the manifest model, and the
//! report model. Every other crate in the workspace depends on this.

pub mod ci;
pub mod config;
pub mod errors;
pub mod manifest;
pub mod report;
pub mod tracing;
pub mod traits;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::GauntletConfig;
pub use errors::error_code::GauntletErrorCode;
pub use manifest::Manifest;
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::ids::TestId;
pub use types::status::{Classification, EffortMode, ExecutionMode, Lifecycle, Status, VerdictResult};
pub use types::test_result::TestResult;
