use thiserror::Error;

/// Maximum length of a response body quoted in an error message.
const MAX_ERROR_BODY_LENGTH: usize = 300;

/// Failures of the Fishchi REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: credential rejected by the server")]
    Unauthorized,

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("API request failed: {0}")]
    Envelope(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Self::Unauthorized;
        }
        let message = match status.canonical_reason() {
            Some(reason) if body.trim().is_empty() => reason.to_string(),
            _ => truncate_body(body),
        };
        Self::Status {
            status: status.as_u16(),
            message,
        }
    }

    /// HTTP status behind this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn unauthorized_has_its_own_variant() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "nope");
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn empty_body_uses_reason_phrase() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "API error (status 404): Not Found");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "é".repeat(400);
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 500);
                assert!(message.ends_with("(800 bytes)"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
