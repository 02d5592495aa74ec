#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fishchi::api::ApiClient;
use fishchi::auth::{
    AuthError, AuthOrchestrator, ChannelDialogLauncher, CredentialStore, DialogHandle,
    DialogLauncher, DialogOptions, HostDialog, KeyValueStorage, PollerConfig, SessionPoller,
    CREDENTIAL_KEY,
};
use tokio::sync::{mpsc, Notify};
use wiremock::MockServer;

pub const LOGIN_PAGE_URL: &str = "https://localhost:3000/login";

#[derive(Default)]
pub struct InMemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.items
            .lock()
            .expect("storage lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .expect("storage lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn credential(&self) -> Option<String> {
        self.get(CREDENTIAL_KEY)
    }
}

#[async_trait]
impl KeyValueStorage for InMemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.get(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.seed(key, value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        self.items
            .lock()
            .expect("storage lock poisoned")
            .remove(key);
        Ok(())
    }
}

/// Storage whose removals wait until [`GatedStorage::release`] is called.
#[derive(Default)]
pub struct GatedStorage {
    pub inner: InMemoryStorage,
    gate: Notify,
}

impl GatedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl KeyValueStorage for GatedStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AuthError> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        self.gate.notified().await;
        self.inner.remove_item(key).await
    }
}

/// Storage that fails every operation.
pub struct BrokenStorage;

#[async_trait]
impl KeyValueStorage for BrokenStorage {
    async fn get_item(&self, _key: &str) -> Result<Option<String>, AuthError> {
        Err(AuthError::Storage("disk unavailable".to_string()))
    }

    async fn set_item(&self, _key: &str, _value: &str) -> Result<(), AuthError> {
        Err(AuthError::Storage("disk unavailable".to_string()))
    }

    async fn remove_item(&self, _key: &str) -> Result<(), AuthError> {
        Err(AuthError::Storage("disk unavailable".to_string()))
    }
}

/// Launcher that records how often it was asked to open a dialog, then
/// delegates to a channel launcher.
pub struct CountingLauncher {
    inner: ChannelDialogLauncher,
    opened: Mutex<Vec<String>>,
}

impl CountingLauncher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostDialog>) {
        let (inner, rx) = ChannelDialogLauncher::new();
        (
            Self {
                inner,
                opened: Mutex::new(Vec::new()),
            },
            rx,
        )
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened.lock().expect("launcher lock poisoned").clone()
    }
}

#[async_trait]
impl DialogLauncher for CountingLauncher {
    async fn open(
        &self,
        url: &str,
        options: &DialogOptions,
    ) -> Result<Box<dyn DialogHandle>, AuthError> {
        self.opened
            .lock()
            .expect("launcher lock poisoned")
            .push(url.to_string());
        self.inner.open(url, options).await
    }
}

pub fn fast_poller(server: &MockServer) -> SessionPoller {
    SessionPoller::new(format!("{}/api/v1/auth", server.uri())).with_config(PollerConfig {
        interval: Duration::from_millis(20),
        max_duration: Duration::from_secs(10),
        abort_on_network_error: true,
    })
}

pub fn orchestrator(
    server: &MockServer,
    launcher: Arc<dyn DialogLauncher>,
    storage: Arc<dyn KeyValueStorage>,
) -> AuthOrchestrator {
    AuthOrchestrator::from_parts(
        fast_poller(server),
        launcher,
        CredentialStore::new(storage),
        ApiClient::new(format!("{}/api/v1", server.uri())),
        LOGIN_PAGE_URL,
    )
}

/// Poll until `check` holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
