//! Error types for the headline classifier

use serde::{Deserialize, Serialize};

/// Result type alias using the headline classifier's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for model retrieval, loading and inference
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors (missing bucket, credentials, bad config file)
    #[error("configuration error: {0}")]
    Config(String),

    /// Remote object does not exist
    #[error("object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Remote object exists but the caller may not read it
    #[error("access denied: s3://{bucket}/{key}")]
    AccessDenied { bucket: String, key: String },

    /// Any other remote fetch failure
    #[error("transfer error: {0}")]
    Transfer(String),

    /// Corrupt, incomplete or unreadable archive
    #[error("archive error: {0}")]
    Archive(String),

    /// Unpacked directory is not a model this crate knows how to load
    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),

    /// Model files present but could not be loaded
    #[error("model load error: {0}")]
    ModelLoad(String),

    /// Input rejected before inference
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Inference runtime failure
    #[error("inference error: {0}")]
    Inference(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse error category reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Transfer,
    Artifact,
    Inference,
    Internal,
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new not-found error
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a new access-denied error
    pub fn access_denied(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::AccessDenied {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a new transfer error
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    /// Create a new archive error
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a new unsupported-format error
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create a new model load error
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create a new invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Category this error is reported under
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::NotFound { .. } | Self::AccessDenied { .. } | Self::Transfer(_) => {
                ErrorKind::Transfer
            }
            Self::Archive(_)
            | Self::UnsupportedFormat(_)
            | Self::ModelLoad(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Artifact,
            Self::InvalidInput(_) | Self::Inference(_) => ErrorKind::Inference,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
