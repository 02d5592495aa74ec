use thiserror::Error;

/// Normalized errors of the dialog login handshake.
///
/// Transport and storage failures are translated into one of these at the
/// component boundary, so the orchestrator never sees a raw `reqwest` or I/O
/// error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Login dialog failed to open: {0}")]
    DialogOpen(String),
    #[error("Login cancelled by user")]
    UserCancelled,
    #[error("Polling for login failed: {0}")]
    PollNetwork(String),
    #[error("Login timed out after {elapsed_secs}s")]
    PollTimeout { elapsed_secs: u64 },
    #[error("Profile validation failed: {0}")]
    ProfileFetch(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("A login is already in progress")]
    LoginInProgress,
}

impl AuthError {
    /// `UserCancelled` is an expected exit path, not an application failure.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }

    /// Whether the failure should be shown to the user.
    ///
    /// Transient polling errors are only logged.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::PollNetwork(_) | Self::Storage(_))
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Storage(error.to_string())
    }
}
