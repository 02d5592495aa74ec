use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque bearer credential issued by the Fishchi service.
///
/// `Debug` and `Display` never print the secret, only its length.
///
/// # Example
/// ```
/// use fishchi::auth::Credential;
///
/// let credential = Credential::new("t1");
/// assert_eq!(credential.expose(), "t1");
/// assert_eq!(format!("{credential:?}"), "Credential(<2 bytes>)");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns `None` for empty or whitespace-only values.
    pub fn parse(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// The raw secret, for the `Authorization` header and storage only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<credential, {} bytes>", self.0.len())
    }
}
