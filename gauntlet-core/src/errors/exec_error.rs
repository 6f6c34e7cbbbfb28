//! Executor infrastructure errors.
//!
//! A test that fails to spawn, times out, or exits non-zero is a `Failed`
//! result, not an error. These variants cover faults in the runner itself.

use super::error_code::{self, GauntletErrorCode};

/// Errors raised by the execution engine's own machinery.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Executor worker thread panicked")]
    WorkerPanicked,

    #[error("Executor channel disconnected: {context}")]
    ChannelDisconnected { context: String },
}

impl GauntletErrorCode for ExecError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::WorkerPanicked => error_code::EXEC_WORKER_PANICKED,
            Self::ChannelDisconnected { .. } => error_code::EXEC_CHANNEL_DISCONNECTED,
        }
    }
}
