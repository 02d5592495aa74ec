//! CLI auth command handlers for login, status, and logout.

use std::sync::Arc;

use crate::auth::{AuthError, AuthOrchestrator, SystemBrowserLauncher};
use crate::config::FishchiConfig;
use crate::error::Result;

/// Orchestrator wired to the system browser and the configured storage.
pub fn orchestrator(config: &FishchiConfig) -> AuthOrchestrator {
    AuthOrchestrator::new(
        config,
        Arc::new(SystemBrowserLauncher::new()),
        config.storage(),
    )
}

/// Handle `fishchi auth login`.
pub async fn handle_login(config: &FishchiConfig) -> Result<()> {
    let auth = orchestrator(config);
    let state = auth.restore().await;
    if let (true, Some(profile)) = (state.is_authenticated(), state.profile.as_ref()) {
        println!("✅ Already logged in as {}", profile.display_name());
        return Ok(());
    }

    println!("🔗 Opening {} in your browser", config.login_page_url());
    println!("⏳ Waiting for you to sign in (Ctrl-C to cancel)...");

    match auth.login().await {
        Ok(profile) => {
            println!("✅ Logged in as {}", profile.display_name());
            Ok(())
        }
        Err(AuthError::UserCancelled) => {
            println!("Login cancelled.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Handle `fishchi auth status`.
pub async fn handle_status(config: &FishchiConfig) -> Result<()> {
    let auth = orchestrator(config);
    let state = auth.restore().await;

    println!("🔐 Authentication Status\n");
    match state.profile.as_ref() {
        Some(profile) if state.is_authenticated() => {
            println!("  User: {}", profile.display_name());
            if let Some(email) = profile.email.as_deref() {
                println!("  Email: {email}");
            }
            println!("  Status: ✅ Logged in");
        }
        _ => println!("  Status: ❌ Not logged in"),
    }
    println!("\n📌 Service: {}", config.api_base_url());
    Ok(())
}

/// Handle `fishchi auth logout`.
pub async fn handle_logout(config: &FishchiConfig) -> Result<()> {
    let auth = orchestrator(config);
    if auth.logout().await.is_err() {
        tracing::warn!("credential removal task did not complete");
    }
    println!("✅ Logged out");
    Ok(())
}
