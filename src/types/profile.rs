//! Authenticated user identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Profile of the signed-in user.
///
/// The service has answered with several field spellings over time, so
/// profiles are built with [`UserProfile::from_value`] rather than derived
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserProfile {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

const ID_FIELDS: &[&str] = &["_id", "id"];
const USERNAME_FIELDS: &[&str] = &["username", "name", "userName", "user_name"];
const EMAIL_FIELDS: &[&str] = &["email", "emailAddress", "email_address"];

impl UserProfile {
    /// Normalize an unwrapped profile response.
    ///
    /// Returns `None` unless the value is an object carrying at least one
    /// identity field (id, username or email).
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let profile = Self {
            id: first_field(object, ID_FIELDS),
            username: first_field(object, USERNAME_FIELDS),
            email: first_field(object, EMAIL_FIELDS),
            avatar: first_field(object, &["avatar"]),
        };
        profile.has_identity().then_some(profile)
    }

    pub fn has_identity(&self) -> bool {
        self.id.is_some() || self.username.is_some() || self.email.is_some()
    }

    /// Best human-readable label for status output.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("unknown user")
    }
}

fn first_field(object: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match object.get(*name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn canonical_fields_are_read() {
        let profile = UserProfile::from_value(&json!({
            "_id": "u1",
            "username": "ada",
            "email": "ada@example.com",
            "avatar": "https://cdn.example.com/ada.png"
        }))
        .unwrap();
        assert_eq!(
            profile,
            UserProfile {
                id: Some("u1".into()),
                username: Some("ada".into()),
                email: Some("ada@example.com".into()),
                avatar: Some("https://cdn.example.com/ada.png".into()),
            }
        );
    }

    #[test]
    fn alternate_spellings_are_normalized() {
        let profile = UserProfile::from_value(&json!({
            "id": 42,
            "userName": "grace",
            "email_address": "grace@example.com"
        }))
        .unwrap();
        assert_eq!(profile.id.as_deref(), Some("42"));
        assert_eq!(profile.username.as_deref(), Some("grace"));
        assert_eq!(profile.email.as_deref(), Some("grace@example.com"));
    }

    #[test]
    fn single_identity_field_is_enough() {
        let profile = UserProfile::from_value(&json!({ "email": "x@example.com" })).unwrap();
        assert_eq!(profile.display_name(), "x@example.com");
    }

    #[test]
    fn missing_identity_is_rejected() {
        assert!(UserProfile::from_value(&json!({ "avatar": "a.png", "username": "" })).is_none());
        assert!(UserProfile::from_value(&json!(["ada"])).is_none());
        assert!(UserProfile::from_value(&Value::Null).is_none());
    }
}
