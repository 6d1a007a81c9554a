//! Core error types.

/// Errors raised while loading declarations or configuration.
///
/// Problems mapping an individual declaration are not errors: they are
/// recorded as skips by the emitter.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A declaration file was structurally invalid.
    #[error("invalid declaration: {detail}")]
    InvalidDeclaration { detail: String },

    /// The generator configuration failed validation.
    #[error("invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    /// A constant denylist pattern did not compile.
    #[error("invalid constant pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
