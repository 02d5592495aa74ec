//! Out-of-process login surface.
//!
//! The panel cannot host the login page itself, so the host opens a separate
//! browser surface and reports back how it was closed. Only a user dismissal
//! cancels the login; every other close leaves the poll running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bon::Builder;
use tokio::sync::mpsc;

use super::error::AuthError;

/// Host code for a dialog closed by the user.
pub const USER_CLOSED_CODE: i64 = 12006;
/// Host code for a dialog navigated away or otherwise dismissed by the user.
pub const USER_NAVIGATED_AWAY_CODE: i64 = 12007;

/// Size and placement of the login surface, in percent of the screen.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct DialogOptions {
    #[builder(default = 60)]
    pub height_percent: u8,
    #[builder(default = 40)]
    pub width_percent: u8,
    #[builder(default)]
    pub display_in_iframe: bool,
}

impl Default for DialogOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Terminal event reported by an open dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogEvent {
    /// Closed or abandoned by the user (host codes 12006 and 12007).
    UserDismissed { code: i64 },
    /// Closed for any other reason, including programmatically.
    Closed { code: Option<i64> },
}

impl DialogEvent {
    pub fn from_host_code(code: i64) -> Self {
        match code {
            USER_CLOSED_CODE | USER_NAVIGATED_AWAY_CODE => Self::UserDismissed { code },
            other => Self::Closed { code: Some(other) },
        }
    }

    pub fn is_user_dismissed(&self) -> bool {
        matches!(self, Self::UserDismissed { .. })
    }
}

/// Opens the login surface.
#[async_trait]
pub trait DialogLauncher: Send + Sync {
    async fn open(
        &self,
        url: &str,
        options: &DialogOptions,
    ) -> Result<Box<dyn DialogHandle>, AuthError>;
}

/// A dialog that is (or was) open.
#[async_trait]
pub trait DialogHandle: Send {
    /// Wait for the next close event. Cancel-safe.
    async fn next_event(&mut self) -> DialogEvent;

    /// Close the surface programmatically. Idempotent.
    fn close(&mut self);
}

/// Dialog launcher that forwards each opened dialog to a host bridge.
///
/// The host receives a [`HostDialog`] per `open` call and reports raw
/// close codes back through it.
///
/// # Example
/// ```
/// use fishchi::auth::{ChannelDialogLauncher, DialogLauncher, DialogOptions, DialogEvent};
///
/// # async fn example() -> Result<(), fishchi::auth::AuthError> {
/// let (launcher, mut opened) = ChannelDialogLauncher::new();
/// let mut dialog = launcher.open("https://localhost:3000/login", &DialogOptions::default()).await?;
/// let host = opened.recv().await.unwrap();
/// host.send_event(12006);
/// assert_eq!(dialog.next_event().await, DialogEvent::UserDismissed { code: 12006 });
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelDialogLauncher {
    opened_tx: mpsc::UnboundedSender<HostDialog>,
}

impl ChannelDialogLauncher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostDialog>) {
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();
        (Self { opened_tx }, opened_rx)
    }
}

#[async_trait]
impl DialogLauncher for ChannelDialogLauncher {
    async fn open(
        &self,
        url: &str,
        options: &DialogOptions,
    ) -> Result<Box<dyn DialogHandle>, AuthError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let host = HostDialog {
            url: url.to_string(),
            options: options.clone(),
            events_tx,
            closed: closed.clone(),
        };
        self.opened_tx
            .send(host)
            .map_err(|_| AuthError::DialogOpen("host surface is not available".to_string()))?;
        Ok(Box::new(ChannelDialog { events_rx, closed }))
    }
}

/// Host side of a dialog opened through [`ChannelDialogLauncher`].
#[derive(Debug)]
pub struct HostDialog {
    pub url: String,
    pub options: DialogOptions,
    events_tx: mpsc::UnboundedSender<i64>,
    closed: Arc<AtomicBool>,
}

impl HostDialog {
    /// Report a raw host event code. Returns `false` once the panel stopped listening.
    pub fn send_event(&self, code: i64) -> bool {
        self.events_tx.send(code).is_ok()
    }

    /// Whether the panel closed the dialog.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct ChannelDialog {
    events_rx: mpsc::UnboundedReceiver<i64>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl DialogHandle for ChannelDialog {
    async fn next_event(&mut self) -> DialogEvent {
        match self.events_rx.recv().await {
            Some(code) => DialogEvent::from_host_code(code),
            None => DialogEvent::Closed { code: None },
        }
    }

    fn close(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.events_rx.close();
            tracing::debug!("login dialog closed");
        }
    }
}

impl Drop for ChannelDialog {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens the login page in the system browser.
///
/// A browser tab cannot report being closed, so Ctrl-C stands in for the
/// user dismissing the dialog.
#[derive(Debug, Clone)]
pub struct SystemBrowserLauncher {
    program: String,
    args: Vec<String>,
}

impl SystemBrowserLauncher {
    pub fn new() -> Self {
        let (program, args) = platform_opener();
        Self { program, args }
    }

    /// Use a custom opener command; the URL is appended as the last argument.
    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for SystemBrowserLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialogLauncher for SystemBrowserLauncher {
    async fn open(
        &self,
        url: &str,
        _options: &DialogOptions,
    ) -> Result<Box<dyn DialogHandle>, AuthError> {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .status()
            .await
            .map_err(|e| AuthError::DialogOpen(format!("{}: {e}", self.program)))?;
        if !status.success() {
            return Err(AuthError::DialogOpen(format!(
                "{} exited with {status}",
                self.program
            )));
        }
        tracing::debug!(program = %self.program, "login page opened in browser");
        Ok(Box::new(BrowserDialog { closed: false }))
    }
}

struct BrowserDialog {
    closed: bool,
}

#[async_trait]
impl DialogHandle for BrowserDialog {
    async fn next_event(&mut self) -> DialogEvent {
        if self.closed {
            return DialogEvent::Closed { code: None };
        }
        match tokio::signal::ctrl_c().await {
            Ok(()) => DialogEvent::UserDismissed {
                code: USER_CLOSED_CODE,
            },
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending().await
            }
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

fn platform_opener() -> (String, Vec<String>) {
    opener_for(std::env::consts::OS)
}

/// Opener command for a target OS. The URL is appended as one argument and
/// must reach the browser unparsed, so no shell sits in between: `cmd` would
/// split the query string at `&`.
fn opener_for(os: &str) -> (String, Vec<String>) {
    match os {
        "macos" => ("open".to_string(), Vec::new()),
        "windows" => (
            "rundll32".to_string(),
            vec!["url.dll,FileProtocolHandler".to_string()],
        ),
        _ => ("xdg-open".to_string(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_codes_are_dismissals() {
        assert!(DialogEvent::from_host_code(12006).is_user_dismissed());
        assert!(DialogEvent::from_host_code(12007).is_user_dismissed());
        assert_eq!(
            DialogEvent::from_host_code(12002),
            DialogEvent::Closed { code: Some(12002) }
        );
    }

    #[test]
    fn default_options_match_login_surface() {
        let options = DialogOptions::default();
        assert_eq!(options.height_percent, 60);
        assert_eq!(options.width_percent, 40);
        assert!(!options.display_in_iframe);
    }

    #[test]
    fn openers_never_go_through_a_shell() {
        for os in ["windows", "macos", "linux", "freebsd"] {
            let (program, args) = opener_for(os);
            assert_ne!(program, "cmd", "{os}");
            assert!(args.iter().all(|a| !a.contains("start")), "{os}");
        }
        assert_eq!(
            opener_for("windows"),
            (
                "rundll32".to_string(),
                vec!["url.dll,FileProtocolHandler".to_string()]
            )
        );
        assert_eq!(opener_for("macos").0, "open");
        assert_eq!(opener_for("linux").0, "xdg-open");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn browser_launcher_passes_url_as_one_argument() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("args");
        let script = format!("printf '%s\\n' \"$@\" > {}", out.display());
        let launcher = SystemBrowserLauncher::with_command(
            "sh",
            vec!["-c".to_string(), script, "opener".to_string()],
        );
        let url = "https://localhost:3000/login?from=office&session_id=abc-123";
        launcher.open(url, &DialogOptions::default()).await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.lines().collect::<Vec<_>>(), vec![url]);
    }

    #[tokio::test]
    async fn dropping_the_dialog_closes_it_for_the_host() {
        let (launcher, mut opened) = ChannelDialogLauncher::new();
        let dialog = launcher
            .open("https://example.test", &DialogOptions::default())
            .await
            .unwrap();
        let host = opened.recv().await.unwrap();
        drop(dialog);
        assert!(host.is_closed());
    }

    #[tokio::test]
    async fn open_fails_when_host_is_gone() {
        let (launcher, opened) = ChannelDialogLauncher::new();
        drop(opened);
        let result = launcher.open("https://example.test", &DialogOptions::default()).await;
        assert!(matches!(result, Err(AuthError::DialogOpen(_))));
    }

    #[tokio::test]
    async fn close_is_visible_to_host() {
        let (launcher, mut opened) = ChannelDialogLauncher::new();
        let mut dialog = launcher
            .open("https://example.test", &DialogOptions::default())
            .await
            .unwrap();
        let host = opened.recv().await.unwrap();
        assert_eq!(host.url, "https://example.test");
        dialog.close();
        dialog.close();
        assert!(host.is_closed());
        assert!(!host.send_event(12006));
    }

    #[tokio::test]
    async fn dropped_host_reads_as_plain_close() {
        let (launcher, mut opened) = ChannelDialogLauncher::new();
        let mut dialog = launcher
            .open("https://example.test", &DialogOptions::default())
            .await
            .unwrap();
        drop(opened.recv().await.unwrap());
        assert_eq!(dialog.next_event().await, DialogEvent::Closed { code: None });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn browser_launcher_reports_failed_opener() {
        let launcher = SystemBrowserLauncher::with_command("false", Vec::new());
        let result = launcher.open("https://example.test", &DialogOptions::default()).await;
        assert!(matches!(result, Err(AuthError::DialogOpen(msg)) if msg.contains("false")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn browser_launcher_opens_with_command() {
        let launcher = SystemBrowserLauncher::with_command("true", Vec::new());
        let mut dialog = launcher
            .open("https://example.test", &DialogOptions::default())
            .await
            .unwrap();
        dialog.close();
        assert_eq!(dialog.next_event().await, DialogEvent::Closed { code: None });
    }

    #[tokio::test]
    async fn missing_opener_fails_to_open() {
        let launcher = SystemBrowserLauncher::with_command("fishchi-no-such-opener", Vec::new());
        let result = launcher.open("https://example.test", &DialogOptions::default()).await;
        assert!(matches!(result, Err(AuthError::DialogOpen(_))));
    }
}
