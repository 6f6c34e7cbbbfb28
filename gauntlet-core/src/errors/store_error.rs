//! Evidence-store persistence errors.
//!
//! A corrupt status file is NOT an error — the store recovers by starting
//! empty and logging a warning. These variants cover I/O faults that make
//! persistence impossible.

use super::error_code::{self, GauntletErrorCode};

/// Errors raised by the evidence store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Status file I/O error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("Status file is locked by another orchestrator: {path}")]
    Locked { path: String },

    #[error("Failed to serialize status file: {message}")]
    Serialize { message: String },
}

impl StoreError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl GauntletErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => error_code::STORE_IO,
            Self::Locked { .. } => error_code::STORE_LOCKED,
            Self::Serialize { .. } => error_code::STORE_SERIALIZE,
        }
    }
}
