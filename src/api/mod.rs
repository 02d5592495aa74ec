//! REST client for the Fishchi service.
//!
//! Wraps bearer-authenticated GETs, strips the server's response envelope and
//! decodes the library types (projects, sources, notes) and the user profile.

pub mod client;
pub mod error;

pub use client::{unwrap_envelope, ApiClient};
pub use error::ApiError;
