//! Error types for Fishchi.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;

/// Primary error type for crate-level operations (config, CLI, browsing).
#[derive(Error, Debug)]
pub enum FishchiError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not logged in")]
    NotLoggedIn,
}

impl FishchiError {
    /// Whether the remote service rejected the credential in use.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized))
    }

    /// Whether this is the expected exit of a login the user abandoned.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::Auth(err) if err.is_user_cancelled())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FishchiError>;
