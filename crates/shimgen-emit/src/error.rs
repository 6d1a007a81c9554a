//! Emission errors.

use std::path::PathBuf;

use shimgen_core::CoreError;
use thiserror::Error;

/// Errors that abort generation of a module.
///
/// Declarations that cannot be mapped are not errors; they are reported as
/// skips.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for emission.
pub type Result<T> = std::result::Result<T, EmitError>;
