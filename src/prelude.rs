//! Convenience re-exports for common use.

pub use crate::api::{ApiClient, ApiError};
pub use crate::auth::{
    AuthError, AuthOrchestrator, AuthState, AuthStatus, Credential, SystemBrowserLauncher,
};
pub use crate::config::FishchiConfig;
pub use crate::error::{FishchiError, Result};
pub use crate::types::{Note, Project, Source, UserProfile};
