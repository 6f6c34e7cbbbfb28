//! Top-level run errors.

use super::error_code::{self, GauntletErrorCode};
use super::{ExecError, GraphError, ManifestError, StoreError};

/// Errors that abort a run before or between phases.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Invalid run configuration: {message}")]
    Config { message: String },

    #[error("Effort mode '{effort}' requires a status file")]
    MissingStore { effort: String },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl GauntletErrorCode for OrchestratorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => error_code::ORCHESTRATOR_CONFIG,
            Self::MissingStore { .. } => error_code::ORCHESTRATOR_MISSING_STORE,
            Self::Manifest(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::Exec(e) => e.error_code(),
        }
    }
}
