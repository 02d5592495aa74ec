use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strum::Display;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::credential::Credential;
use super::dialog::{DialogEvent, DialogHandle, DialogLauncher, DialogOptions};
use super::error::AuthError;
use super::poller::{PollHandle, PollOutcome, SessionPoller};
use super::session::{login_url, LoginSession, SessionStatus};
use super::store::{CredentialStore, KeyValueStorage};
use crate::api::ApiClient;
use crate::config::FishchiConfig;
use crate::types::UserProfile;

/// Coarse authentication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AuthStatus {
    #[default]
    LoggedOut,
    LoggingIn,
    LoggedIn,
}

/// Observable authentication state of the panel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    pub status: AuthStatus,
    pub credential: Option<Credential>,
    pub profile: Option<UserProfile>,
    pub is_loading: bool,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::LoggedIn
    }

    fn logged_in(credential: Credential, profile: UserProfile) -> Self {
        Self {
            status: AuthStatus::LoggedIn,
            credential: Some(credential),
            profile: Some(profile),
            is_loading: false,
        }
    }
}

/// How the race between the poller and the dialog ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Succeeded(Credential),
    Cancelled,
    Failed(AuthError),
}

/// Wait for whichever of {poll result, user dismissal} comes first.
///
/// A dialog closed for any other reason is ignored and the poll keeps
/// running alone.
pub async fn race_session(poll: &mut PollHandle, dialog: &mut dyn DialogHandle) -> SessionOutcome {
    let mut dialog_open = true;
    loop {
        let event = tokio::select! {
            outcome = poll.outcome() => return match outcome {
                PollOutcome::Credential(credential) => SessionOutcome::Succeeded(credential),
                PollOutcome::Failed(err) => SessionOutcome::Failed(err),
                PollOutcome::Cancelled => SessionOutcome::Cancelled,
            },
            event = dialog.next_event(), if dialog_open => event,
        };
        match event {
            DialogEvent::UserDismissed { code } => {
                tracing::debug!(session_id = %poll.session_id(), code, "dialog dismissed by user");
                poll.cancel();
                return SessionOutcome::Cancelled;
            }
            DialogEvent::Closed { code } => {
                tracing::debug!(session_id = %poll.session_id(), ?code, "dialog closed, still polling");
                dialog_open = false;
            }
        }
    }
}

struct ActiveLogin {
    generation: u64,
    abort_tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct Control {
    /// Bumped by every login, logout and restore; stale work compares against it.
    generation: u64,
    active: Option<ActiveLogin>,
}

/// Sole owner and mutator of [`AuthState`].
///
/// Composes the dialog launcher, session poller and credential store into
/// `login`, `logout` and `restore`. Every method takes `&self`; share it
/// behind an `Arc`.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use fishchi::auth::{AuthOrchestrator, SystemBrowserLauncher};
/// use fishchi::config::FishchiConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = FishchiConfig::from_env()?;
/// let auth = AuthOrchestrator::new(&config, Arc::new(SystemBrowserLauncher::new()), config.storage());
/// if !auth.restore().await.is_authenticated() {
///     let profile = auth.login().await?;
///     println!("signed in as {}", profile.display_name());
/// }
/// # Ok(())
/// # }
/// ```
pub struct AuthOrchestrator {
    poller: SessionPoller,
    launcher: Arc<dyn DialogLauncher>,
    store: CredentialStore,
    api: ApiClient,
    login_page_url: String,
    dialog_options: DialogOptions,
    control: Mutex<Control>,
    state_tx: watch::Sender<AuthState>,
}

impl AuthOrchestrator {
    pub fn new(
        config: &FishchiConfig,
        launcher: Arc<dyn DialogLauncher>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        Self::from_parts(
            SessionPoller::new(config.auth_base_url()).with_config(config.poller_config()),
            launcher,
            CredentialStore::new(storage),
            ApiClient::new(config.api_base_url()),
            config.login_page_url(),
        )
    }

    pub fn from_parts(
        poller: SessionPoller,
        launcher: Arc<dyn DialogLauncher>,
        store: CredentialStore,
        api: ApiClient,
        login_page_url: impl Into<String>,
    ) -> Self {
        let (state_tx, _) = watch::channel(AuthState::default());
        Self {
            poller,
            launcher,
            store,
            api,
            login_page_url: login_page_url.into(),
            dialog_options: DialogOptions::default(),
            control: Mutex::new(Control::default()),
            state_tx,
        }
    }

    pub fn with_dialog_options(mut self, options: DialogOptions) -> Self {
        self.dialog_options = options;
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Credential of the signed-in user, if any.
    pub fn credential(&self) -> Option<Credential> {
        self.state_tx.borrow().credential.clone()
    }

    /// Run the dialog login flow with a fresh session id.
    ///
    /// # Errors
    ///
    /// [`AuthError::LoginInProgress`] if a login is already running,
    /// [`AuthError::UserCancelled`] if the user dismissed the dialog, or the
    /// error that ended the attempt. State is `LoggedOut` after any error
    /// except `LoginInProgress`.
    pub async fn login(&self) -> Result<UserProfile, AuthError> {
        self.login_with_session(LoginSession::new()).await
    }

    /// Run the dialog login flow for a caller-provided session.
    pub async fn login_with_session(
        &self,
        mut session: LoginSession,
    ) -> Result<UserProfile, AuthError> {
        let (generation, mut abort_rx) = match self.begin_login() {
            Ok(BeginLogin::Started { generation, abort_rx }) => (generation, abort_rx),
            Ok(BeginLogin::AlreadyLoggedIn(profile)) => return Ok(profile),
            Err(e) => return Err(e),
        };
        let mut guard = LoginGuard {
            auth: self,
            generation,
            stored: None,
            finished: false,
        };
        let session_id = session.session_id.clone();
        tracing::debug!(session_id = %session_id, "login started");

        // Polling starts before the dialog open call returns.
        let mut poll = self.poller.start(&session_id);
        let url = login_url(&self.login_page_url, &session_id);
        let mut dialog = match self.launcher.open(&url, &self.dialog_options).await {
            Ok(dialog) => dialog,
            Err(e) => {
                poll.cancel();
                session.finish(SessionStatus::Failed);
                tracing::warn!(session_id = %session_id, error = %e, "login dialog failed to open");
                guard.finish(AuthState::default());
                return Err(e);
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = &mut abort_rx => SessionOutcome::Cancelled,
            outcome = race_session(&mut poll, dialog.as_mut()) => outcome,
        };
        poll.cancel();

        let credential = match outcome {
            SessionOutcome::Succeeded(credential) => credential,
            SessionOutcome::Cancelled => {
                dialog.close();
                session.finish(SessionStatus::Cancelled);
                guard.finish(AuthState::default());
                return Err(AuthError::UserCancelled);
            }
            SessionOutcome::Failed(err) => {
                dialog.close();
                session.finish(SessionStatus::Failed);
                tracing::warn!(session_id = %session_id, error = %err, "login failed");
                guard.finish(AuthState::default());
                return Err(err);
            }
        };

        session.finish(SessionStatus::Resolved);
        guard.stored = Some(credential.clone());
        self.store.set(&credential).await;
        let validated = self.api.fetch_profile(&credential).await;
        dialog.close();

        match validated {
            Ok(profile) => {
                if guard.finish(AuthState::logged_in(credential.clone(), profile.clone())) {
                    guard.stored = None;
                    tracing::info!(session_id = %session_id, user = %profile.display_name(), "login succeeded");
                    return Ok(profile);
                }
                // Logged out while the profile was loading.
                self.store.remove_if(&credential).await;
                guard.stored = None;
                Err(AuthError::UserCancelled)
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "credential failed validation");
                guard.finish(AuthState::default());
                self.store.remove_if(&credential).await;
                guard.stored = None;
                Err(AuthError::ProfileFetch(e.to_string()))
            }
        }
    }

    /// Log out.
    ///
    /// The in-memory state is `LoggedOut` when this returns, and any login in
    /// flight is cancelled. Removing the stored credential happens on a
    /// spawned task; its failure is only logged. Must be called within a
    /// Tokio runtime.
    pub fn logout(&self) -> JoinHandle<()> {
        {
            let mut control = self.lock_control();
            control.generation += 1;
            if let Some(active) = control.active.take() {
                let _ = active.abort_tx.send(());
            }
            self.state_tx.send_replace(AuthState::default());
        }
        tracing::debug!("logged out, removing stored credential");

        let store = self.store.clone();
        tokio::spawn(async move {
            store.remove().await;
        })
    }

    /// Reconcile with storage at startup.
    ///
    /// A stored credential is validated against the profile endpoint. If it
    /// no longer resolves to a user it is removed and the state stays
    /// `LoggedOut`.
    pub async fn restore(&self) -> AuthState {
        let generation = {
            let mut control = self.lock_control();
            if control.active.is_some() {
                return self.state();
            }
            control.generation += 1;
            self.state_tx.send_modify(|state| state.is_loading = true);
            control.generation
        };

        let next = match self.store.get().await {
            None => {
                tracing::debug!("no stored credential");
                AuthState::default()
            }
            Some(credential) => match self.api.fetch_profile(&credential).await {
                Ok(profile) => {
                    tracing::info!(user = %profile.display_name(), "stored credential is valid");
                    AuthState::logged_in(credential, profile)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stored credential rejected, discarding");
                    self.store.remove().await;
                    AuthState::default()
                }
            },
        };

        let control = self.lock_control();
        if control.generation == generation && control.active.is_none() {
            self.state_tx.send_replace(next);
        }
        drop(control);
        self.state()
    }

    fn begin_login(&self) -> Result<BeginLogin, AuthError> {
        let mut control = self.lock_control();
        if control.active.is_some() {
            return Err(AuthError::LoginInProgress);
        }
        {
            let state = self.state_tx.borrow();
            if let (AuthStatus::LoggedIn, Some(profile)) = (state.status, state.profile.as_ref()) {
                return Ok(BeginLogin::AlreadyLoggedIn(profile.clone()));
            }
        }
        control.generation += 1;
        let generation = control.generation;
        let (abort_tx, abort_rx) = oneshot::channel();
        control.active = Some(ActiveLogin {
            generation,
            abort_tx,
        });
        self.state_tx.send_replace(AuthState {
            status: AuthStatus::LoggingIn,
            credential: None,
            profile: None,
            is_loading: true,
        });
        Ok(BeginLogin::Started {
            generation,
            abort_rx,
        })
    }

    /// Apply the terminal state of a login attempt. Returns `false` when the
    /// attempt was superseded and the state was left alone.
    fn finish_login(&self, generation: u64, next: AuthState) -> bool {
        let mut control = self.lock_control();
        match control.active.as_ref() {
            Some(active) if active.generation == generation => {
                control.active = None;
                self.state_tx.send_replace(next);
                true
            }
            _ => {
                tracing::debug!(generation, "ignoring result of superseded login");
                false
            }
        }
    }

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ties a login attempt to the future running it.
///
/// Dropping the future before it finishes returns the orchestrator to
/// `LoggedOut` and discards a credential the attempt already stored.
struct LoginGuard<'a> {
    auth: &'a AuthOrchestrator,
    generation: u64,
    stored: Option<Credential>,
    finished: bool,
}

impl LoginGuard<'_> {
    /// Returns `false` when the attempt was superseded.
    fn finish(&mut self, next: AuthState) -> bool {
        self.finished = true;
        self.auth.finish_login(self.generation, next)
    }
}

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(generation = self.generation, "login attempt dropped");
            self.auth.finish_login(self.generation, AuthState::default());
        }
        let Some(credential) = self.stored.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let store = self.auth.store.clone();
                runtime.spawn(async move {
                    store.remove_if(&credential).await;
                });
            }
            Err(_) => tracing::warn!("no runtime left to discard credential of dropped login"),
        }
    }
}

enum BeginLogin {
    Started {
        generation: u64,
        abort_rx: oneshot::Receiver<()>,
    },
    AlreadyLoggedIn(UserProfile),
}
