//! Manifest loading and validation errors.

use super::error_code::{self, GauntletErrorCode};

/// Errors raised while loading or validating a manifest document.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest: {message}")]
    Io { message: String },

    #[error("Failed to parse manifest JSON: {message}")]
    Parse { message: String },

    #[error("Test '{id}' is listed in the test set but has no definition")]
    MissingDefinition { id: String },

    #[error("Test '{id}' has an empty assertion")]
    EmptyAssertion { id: String },
}

impl GauntletErrorCode for ManifestError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => error_code::MANIFEST_IO,
            Self::Parse { .. } => error_code::MANIFEST_PARSE,
            Self::MissingDefinition { .. } => error_code::MANIFEST_MISSING_DEFINITION,
            Self::EmptyAssertion { .. } => error_code::MANIFEST_EMPTY_ASSERTION,
        }
    }
}
