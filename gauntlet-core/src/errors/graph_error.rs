//! Test-graph construction and query errors.

use super::error_code::{self, GauntletErrorCode};

/// Errors raised while building or querying the test DAG.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The dependency graph contains a cycle. The path lists the full
    /// cycle in `A → B → A` form.
    #[error("Dependency cycle detected: {path}")]
    Cycle { path: String },

    #[error("Test '{id}' depends on unknown test '{dependency}'")]
    UnknownDependency { id: String, dependency: String },

    #[error("Unknown test id '{id}'")]
    UnknownTest { id: String },
}

impl GauntletErrorCode for GraphError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Cycle { .. } => error_code::GRAPH_CYCLE,
            Self::UnknownDependency { .. } => error_code::GRAPH_UNKNOWN_DEPENDENCY,
            Self::UnknownTest { .. } => error_code::GRAPH_UNKNOWN_TEST,
        }
    }
}
