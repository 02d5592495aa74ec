use chrono::{DateTime, Utc};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle of a single login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Resolved,
    Failed,
    Cancelled,
}

/// Correlation record shared between the panel and the external login page.
///
/// Created when a login starts and discarded once it reaches a terminal
/// status. Never persisted.
///
/// # Example
/// ```
/// use fishchi::auth::{LoginSession, SessionStatus};
///
/// let session = LoginSession::with_id("abc-123");
/// assert_eq!(session.session_id, "abc-123");
/// assert_eq!(session.status, SessionStatus::Pending);
/// ```
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
}

impl LoginSession {
    /// Fresh session with a random UUID v4 id.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            created_at: Utc::now(),
            status: SessionStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != SessionStatus::Pending
    }

    /// Move to a terminal status. A session that already left `Pending`
    /// keeps its first terminal status; returns whether this call applied.
    pub fn finish(&mut self, status: SessionStatus) -> bool {
        if self.is_terminal() || status == SessionStatus::Pending {
            return false;
        }
        self.status = status;
        true
    }
}

/// Login page URL carrying the session id: `{login_page_url}?from=office&session_id={id}`.
pub fn login_url(login_page_url: &str, session_id: &str) -> String {
    let params = [("from", "office"), ("session_id", session_id)];
    match reqwest::Url::parse_with_params(login_page_url, params) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{login_page_url}?from=office&session_id={session_id}"),
    }
}

impl Default for LoginSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sessions_have_unique_ids() {
        let a = LoginSession::new();
        let b = LoginSession::new();
        assert_ne!(a.session_id, b.session_id);
        assert!(Uuid::parse_str(&a.session_id).is_ok());
    }

    #[test]
    fn first_terminal_status_wins() {
        let mut session = LoginSession::with_id("abc-123");
        assert!(session.finish(SessionStatus::Cancelled));
        assert!(!session.finish(SessionStatus::Resolved));
        assert_eq!(session.status, SessionStatus::Cancelled);
    }

    #[test]
    fn pending_is_not_a_terminal_transition() {
        let mut session = LoginSession::with_id("abc-123");
        assert!(!session.finish(SessionStatus::Pending));
        assert!(!session.is_terminal());
    }

    #[test]
    fn login_url_embeds_session_id() {
        assert_eq!(
            login_url("https://localhost:3000/login", "abc-123"),
            "https://localhost:3000/login?from=office&session_id=abc-123"
        );
    }

    #[test]
    fn login_url_keeps_existing_query() {
        assert_eq!(
            login_url("https://app.fishchi.test/login?lang=en", "abc-123"),
            "https://app.fishchi.test/login?lang=en&from=office&session_id=abc-123"
        );
    }

    #[test]
    fn status_display_is_lowercase() {
        assert_eq!(SessionStatus::Resolved.to_string(), "resolved");
        assert_eq!("cancelled".parse::<SessionStatus>().unwrap(), SessionStatus::Cancelled);
    }
}
