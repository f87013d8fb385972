//! Error types for LeafScan

/// Result type alias using LeafScan's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for LeafScan operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request input is missing or unusable
    #[error("{0}")]
    InvalidInput(String),

    /// Uploaded bytes are not a decodable image
    #[error("{0}")]
    Decode(String),

    /// Model forward pass or tensor handling failed
    #[error("inference error: {0}")]
    Inference(String),

    /// Model weights or labels could not be loaded
    #[error("model error: {0}")]
    Model(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Inference did not finish within its budget
    #[error("inference timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new model loading error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable name of the variant, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Decode(_) => "decode",
            Self::Inference(_) => "inference",
            Self::Model(_) => "model",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Timeout => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}
