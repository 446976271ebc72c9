//! Top-level CLI error type

use qflash_core::error::{OperationError, ResolutionError};

/// Everything a command can fail with
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("profile resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("flash operation failed: {0}")]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("profile file: {0}")]
    ProfileParse(#[from] ron::error::SpannedError),

    #[error("profile encode: {0}")]
    ProfileEncode(#[from] ron::Error),

    #[error(transparent)]
    ProgressTemplate(#[from] indicatif::style::TemplateError),

    #[error("{0}")]
    Usage(String),
}
