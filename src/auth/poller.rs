use std::time::Duration;

use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::credential::Credential;
use super::error::AuthError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_MAX_POLL_DURATION: Duration = Duration::from_secs(10 * 60);
/// Floor applied to configured intervals; a zero period would stall the timer.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Timing and failure policy of a [`SessionPoller`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Fixed delay between queries. No backoff.
    pub interval: Duration,
    /// The poller gives up with [`AuthError::PollTimeout`] after this long.
    pub max_duration: Duration,
    /// Treat a transport failure as fatal instead of retrying on the next tick.
    pub abort_on_network_error: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_duration: DEFAULT_MAX_POLL_DURATION,
            abort_on_network_error: true,
        }
    }
}

/// Terminal result of one polling session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Credential(Credential),
    Failed(AuthError),
    Cancelled,
}

/// Result of a single query against the poll endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAttempt {
    /// The login completed and the server handed over the credential.
    Ready(Credential),
    /// 2xx without a usable token.
    NotReady,
    /// Non-2xx response, normally 404 while the login is pending.
    Status(u16),
    /// The request never produced a response.
    Network(String),
}

/// Queries `GET {auth_base}/poll-login/{session_id}` until the external login
/// page hands over a credential.
///
/// # Example
/// ```no_run
/// use fishchi::auth::{PollOutcome, SessionPoller};
///
/// # async fn example() {
/// let poller = SessionPoller::new("https://localhost:5000/api/v1/auth");
/// let mut handle = poller.start("abc-123");
/// match handle.outcome().await {
///     PollOutcome::Credential(credential) => println!("got {credential}"),
///     PollOutcome::Failed(err) => eprintln!("{err}"),
///     PollOutcome::Cancelled => {}
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionPoller {
    client: reqwest::Client,
    auth_base_url: String,
    config: PollerConfig,
}

impl SessionPoller {
    pub fn new(auth_base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth_base_url: auth_base_url.into(),
            config: PollerConfig::default(),
        }
    }

    /// Replace the polling policy. Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn with_config(mut self, mut config: PollerConfig) -> Self {
        if config.interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                interval_ms = config.interval.as_millis() as u64,
                "poll interval too short, using minimum"
            );
            config.interval = MIN_POLL_INTERVAL;
        }
        self.config = config;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn poll_url(&self, session_id: &str) -> String {
        format!(
            "{}/poll-login/{}",
            self.auth_base_url.trim_end_matches('/'),
            session_id
        )
    }

    /// Issue one query without scheduling anything.
    pub async fn poll_once(&self, session_id: &str) -> PollAttempt {
        query(&self.client, &self.poll_url(session_id)).await
    }

    /// Start polling on a background task.
    ///
    /// The returned handle owns the timer: cancelling or dropping it stops
    /// all further queries for this session.
    pub fn start(&self, session_id: &str) -> PollHandle {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        let client = self.client.clone();
        let url = self.poll_url(session_id);
        let config = self.config.clone();
        let id = session_id.to_string();

        let task = tokio::spawn(async move {
            let outcome = poll_until_resolved(&client, &url, &config, &id, cancel_rx).await;
            let _ = result_tx.send(outcome);
        });

        PollHandle {
            session_id: session_id.to_string(),
            cancel_tx: Some(cancel_tx),
            result_rx: Some(result_rx),
            finished: None,
            task,
        }
    }
}

/// Handle for an in-flight polling session.
#[derive(Debug)]
pub struct PollHandle {
    session_id: String,
    cancel_tx: Option<oneshot::Sender<()>>,
    result_rx: Option<oneshot::Receiver<PollOutcome>>,
    finished: Option<PollOutcome>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Stop the poll. Returns `true` if it was still running.
    ///
    /// The background task is aborted as well, so a request that is in
    /// flight is dropped and its response never observed.
    pub fn cancel(&mut self) -> bool {
        let was_running = match self.cancel_tx.take() {
            Some(tx) => tx.send(()).is_ok() && !self.task.is_finished(),
            None => false,
        };
        self.task.abort();
        if was_running {
            tracing::debug!(session_id = %self.session_id, "polling cancelled");
        }
        was_running
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal outcome.
    ///
    /// Cancel-safe: dropping this future before it completes leaves the
    /// handle usable. Once resolved, later calls return the same outcome.
    pub async fn outcome(&mut self) -> PollOutcome {
        if let Some(outcome) = &self.finished {
            return outcome.clone();
        }
        let outcome = match self.result_rx.as_mut() {
            Some(rx) => rx.await.unwrap_or(PollOutcome::Cancelled),
            None => PollOutcome::Cancelled,
        };
        self.result_rx = None;
        self.finished = Some(outcome.clone());
        outcome
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Deserialize)]
struct PollLoginResponse {
    #[serde(default)]
    token: Option<String>,
}

async fn query(client: &reqwest::Client, url: &str) -> PollAttempt {
    let resp = match client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => return PollAttempt::Network(e.to_string()),
    };
    let status = resp.status();
    if !status.is_success() {
        return PollAttempt::Status(status.as_u16());
    }
    match resp.json::<PollLoginResponse>().await {
        Ok(payload) => match payload.token.and_then(Credential::parse) {
            Some(credential) => PollAttempt::Ready(credential),
            None => PollAttempt::NotReady,
        },
        Err(e) => {
            tracing::debug!(error = %e, "unreadable poll response");
            PollAttempt::NotReady
        }
    }
}

async fn poll_until_resolved(
    client: &reqwest::Client,
    url: &str,
    config: &PollerConfig,
    session_id: &str,
    mut cancel_rx: oneshot::Receiver<()>,
) -> PollOutcome {
    let started = Instant::now();
    let deadline = tokio::time::sleep_until(started + config.max_duration);
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval_at(started + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let timed_out = || {
        tracing::warn!(session_id = %session_id, "login polling timed out");
        PollOutcome::Failed(AuthError::PollTimeout {
            elapsed_secs: started.elapsed().as_secs(),
        })
    };

    tracing::debug!(
        session_id = %session_id,
        interval_ms = config.interval.as_millis() as u64,
        "polling started"
    );

    let mut attempt_no: u32 = 0;
    loop {
        // A dropped sender counts as cancellation too.
        tokio::select! {
            biased;
            _ = &mut cancel_rx => return PollOutcome::Cancelled,
            _ = &mut deadline => return timed_out(),
            _ = ticker.tick() => {}
        }

        attempt_no += 1;
        let attempt = tokio::select! {
            biased;
            _ = &mut cancel_rx => return PollOutcome::Cancelled,
            _ = &mut deadline => return timed_out(),
            attempt = query(client, url) => attempt,
        };

        match attempt {
            PollAttempt::Ready(credential) => {
                tracing::debug!(
                    session_id = %session_id,
                    attempt = attempt_no,
                    credential_len = credential.expose().len(),
                    "credential received"
                );
                return PollOutcome::Credential(credential);
            }
            PollAttempt::NotReady => {
                tracing::debug!(session_id = %session_id, attempt = attempt_no, "login not ready");
            }
            PollAttempt::Status(status) => {
                tracing::debug!(
                    session_id = %session_id,
                    attempt = attempt_no,
                    status,
                    "poll returned non-success status"
                );
            }
            PollAttempt::Network(message) if config.abort_on_network_error => {
                tracing::warn!(session_id = %session_id, error = %message, "polling aborted");
                return PollOutcome::Failed(AuthError::PollNetwork(message));
            }
            PollAttempt::Network(message) => {
                tracing::warn!(session_id = %session_id, error = %message, "poll request failed, retrying");
            }
        }
    }
}
