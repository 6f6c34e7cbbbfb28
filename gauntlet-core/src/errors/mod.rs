//! Error types for every layer of the workspace.
//!
//! One enum per layer, all carrying stable error codes via
//! [`error_code::GauntletErrorCode`] for host-facing surfaces. Per-test
//! execution failures are NOT errors — they are recorded as `Failed`
//! results; these enums cover configuration and infrastructure faults.

pub mod error_code;
pub mod exec_error;
pub mod graph_error;
pub mod manifest_error;
pub mod orchestrator_error;
pub mod store_error;

pub use exec_error::ExecError;
pub use graph_error::GraphError;
pub use manifest_error::ManifestError;
pub use orchestrator_error::OrchestratorError;
pub use store_error::StoreError;
