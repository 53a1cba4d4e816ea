//! Error types for Groundwork

use thiserror::Error;

/// The main error type for Groundwork operations
#[derive(Debug, Error)]
pub enum GroundworkError {
    #[error("Invalid grid dimension: {width}x{height} with {layers} layer(s)")]
    InvalidDimension { width: i64, height: i64, layers: i64 },

    #[error("Invalid layer assignment: {0}")]
    InvalidLayerAssignment(String),

    #[error("Shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("Sampler fault in binding {binding}: {message}")]
    SamplerFault { binding: usize, message: String },

    #[error("Synthesis cancelled")]
    Cancelled,

    #[error("Mask load error: {0}")]
    MaskLoad(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),
}

/// Result type alias for Groundwork operations
pub type Result<T> = std::result::Result<T, GroundworkError>;

impl From<toml::de::Error> for GroundworkError {
    fn from(err: toml::de::Error) -> Self {
        GroundworkError::TomlParse(err.to_string())
    }
}

impl From<toml::ser::Error> for GroundworkError {
    fn from(err: toml::ser::Error) -> Self {
        GroundworkError::TomlSer(err.to_string())
    }
}
