//! Dialog login handshake and credential lifecycle.
//!
//! A login opens the login page in a separate surface while a poller asks
//! the service whether that page finished signing the user in. The first of
//! {credential received, dialog dismissed, fatal poll error} ends the
//! attempt; a received credential is persisted and validated against the
//! user profile before the panel counts as logged in.

pub mod credential;
pub mod dialog;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod session;
pub mod store;

pub use credential::Credential;
pub use dialog::{
    ChannelDialogLauncher, DialogEvent, DialogHandle, DialogLauncher, DialogOptions, HostDialog,
    SystemBrowserLauncher,
};
pub use error::AuthError;
pub use orchestrator::{race_session, AuthOrchestrator, AuthState, AuthStatus, SessionOutcome};
pub use poller::{PollAttempt, PollHandle, PollOutcome, PollerConfig, SessionPoller};
pub use session::{login_url, LoginSession, SessionStatus};
pub use store::{CredentialStore, FileKeyValueStorage, KeyValueStorage, CREDENTIAL_KEY};
