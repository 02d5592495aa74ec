use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;
use crate::auth::Credential;
use crate::types::{Note, Project, Source, UserProfile};

/// Client for the Fishchi REST API.
///
/// Every response goes through [`unwrap_envelope`], so callers only ever see
/// the payload.
///
/// # Example
/// ```no_run
/// use fishchi::api::ApiClient;
/// use fishchi::auth::Credential;
///
/// # async fn example() -> Result<(), fishchi::api::ApiError> {
/// let client = ApiClient::new("https://localhost:5000/api/v1");
/// let profile = client.fetch_profile(&Credential::new("t1")).await?;
/// println!("{}", profile.display_name());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticated GET returning the unwrapped payload.
    pub async fn get(&self, path: &str, token: &Credential) -> Result<Value, ApiError> {
        self.get_with_query(path, &[], token).await
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: &Credential,
    ) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let resp = self
            .client
            .get(&url)
            .query(query)
            .header("Accept", "application/json")
            .header("Authorization", token.bearer_header())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = ApiError::from_status(status, &body);
            tracing::debug!(path, status = status.as_u16(), "API request failed");
            return Err(err);
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("invalid JSON from {path}: {e}")))?;
        unwrap_envelope(body)
    }

    /// Resolve the credential to a user identity.
    ///
    /// Tries `/users/me` first and falls back to `/users/profile` when the
    /// primary endpoint fails or answers without identity fields.
    pub async fn fetch_profile(&self, token: &Credential) -> Result<UserProfile, ApiError> {
        match self.get("users/me", token).await {
            Ok(value) => {
                if let Some(profile) = UserProfile::from_value(&value) {
                    return Ok(profile);
                }
                tracing::debug!("/users/me returned no identity fields, trying /users/profile");
            }
            Err(e) => {
                tracing::debug!(error = %e, "/users/me failed, trying /users/profile");
            }
        }

        let value = self.get("users/profile", token).await?;
        let Some(object) = value.as_object() else {
            return Err(ApiError::InvalidResponse(format!(
                "profile is not an object: {}",
                json_kind(&value)
            )));
        };
        UserProfile::from_value(&value).ok_or_else(|| {
            let keys: Vec<&str> = object.keys().map(String::as_str).collect();
            ApiError::InvalidResponse(format!(
                "profile missing identity fields (available: {})",
                keys.join(", ")
            ))
        })
    }

    /// All projects of the signed-in user. 404 means none.
    pub async fn projects(&self, token: &Credential) -> Result<Vec<Project>, ApiError> {
        let value = match self.get("projects", token).await {
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            other => other?,
        };
        decode_list(value, "projects")
    }

    /// Sources of a project. Accepts the paginated `{ "sources": [...] }`
    /// shape as well as a bare array.
    pub async fn sources(
        &self,
        token: &Credential,
        project_id: &str,
    ) -> Result<Vec<Source>, ApiError> {
        let value = match self
            .get_with_query("sources", &[("projectId", project_id)], token)
            .await
        {
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            other => other?,
        };
        let list = match value {
            Value::Object(mut page) => page.remove("sources").ok_or_else(|| {
                ApiError::InvalidResponse("sources response has no sources field".to_string())
            })?,
            other => other,
        };
        let sources: Vec<Source> = decode_list(list, "sources")?;
        tracing::debug!(project_id, count = sources.len(), "sources loaded");
        Ok(sources)
    }

    /// Notes taken on one source. 404 means none.
    pub async fn notes(
        &self,
        token: &Credential,
        project_id: &str,
        source_id: &str,
    ) -> Result<Vec<Note>, ApiError> {
        let value = match self
            .get_with_query(
                "notes",
                &[("projectId", project_id), ("sourceId", source_id)],
                token,
            )
            .await
        {
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            other => other?,
        };
        decode_list(value, "notes")
    }
}

/// Strip the server's response envelope.
///
/// Handles `{status, data}`, `{success, data}` and bare payloads. An
/// envelope that reports failure becomes [`ApiError::Envelope`] carrying the
/// server's `message` or `error`.
pub fn unwrap_envelope(body: Value) -> Result<Value, ApiError> {
    let Value::Object(mut object) = body else {
        return Ok(body);
    };
    if let Some(status) = object.get("status") {
        let ok = matches!(status, Value::Bool(true))
            || matches!(status, Value::String(s) if s == "success");
        if !ok {
            return Err(ApiError::Envelope(envelope_message(&object)));
        }
        return Ok(object.remove("data").unwrap_or(Value::Null));
    }
    if let Some(success) = object.get("success") {
        if matches!(success, Value::Bool(false)) {
            return Err(ApiError::Envelope(envelope_message(&object)));
        }
        return Ok(object.remove("data").unwrap_or(Value::Null));
    }
    Ok(Value::Object(object))
}

fn envelope_message(object: &serde_json::Map<String, Value>) -> String {
    ["message", "error"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .unwrap_or("API request failed")
        .to_string()
}

fn decode_list<T: DeserializeOwned>(value: Value, what: &str) -> Result<Vec<T>, ApiError> {
    if !value.is_array() {
        return Err(ApiError::InvalidResponse(format!(
            "expected array of {what}, got {}",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("malformed {what}: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn status_success_envelope_is_unwrapped() {
        let data = unwrap_envelope(json!({ "status": "success", "data": { "id": 1 } })).unwrap();
        assert_eq!(data, json!({ "id": 1 }));
        let data = unwrap_envelope(json!({ "status": true, "data": [1, 2] })).unwrap();
        assert_eq!(data, json!([1, 2]));
    }

    #[test]
    fn status_failure_envelope_is_an_error() {
        let err = unwrap_envelope(json!({ "status": "error", "message": "boom" })).unwrap_err();
        assert!(matches!(err, ApiError::Envelope(msg) if msg == "boom"));
    }

    #[test]
    fn success_envelope_is_unwrapped() {
        let data = unwrap_envelope(json!({
            "statusCode": 200,
            "success": true,
            "message": "ok",
            "data": { "username": "ada" }
        }))
        .unwrap();
        assert_eq!(data, json!({ "username": "ada" }));
    }

    #[test]
    fn success_without_data_yields_null() {
        assert_eq!(unwrap_envelope(json!({ "success": true })).unwrap(), Value::Null);
    }

    #[test]
    fn success_false_uses_error_field() {
        let err = unwrap_envelope(json!({ "success": false, "error": "denied" })).unwrap_err();
        assert!(matches!(err, ApiError::Envelope(msg) if msg == "denied"));
        let err = unwrap_envelope(json!({ "success": false })).unwrap_err();
        assert!(matches!(err, ApiError::Envelope(msg) if msg == "API request failed"));
    }

    #[test]
    fn bare_payload_passes_through() {
        assert_eq!(
            unwrap_envelope(json!({ "username": "ada" })).unwrap(),
            json!({ "username": "ada" })
        );
        assert_eq!(unwrap_envelope(json!([1])).unwrap(), json!([1]));
    }

    #[test]
    fn decode_list_rejects_objects() {
        let err = decode_list::<Project>(json!({ "projects": [] }), "projects").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(msg) if msg.contains("got object")));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("https://localhost:5000/api/v1/");
        assert_eq!(client.base_url(), "https://localhost:5000/api/v1");
    }
}
