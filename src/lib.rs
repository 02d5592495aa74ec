//! Fishchi panel core.
//!
//! Signs the user in to the Fishchi research service through an
//! out-of-band dialog login, keeps the bearer credential across restarts and
//! reads the user's saved projects, sources and notes.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use fishchi::prelude::*;
//!
//! # async fn example() -> fishchi::error::Result<()> {
//! let config = FishchiConfig::from_env()?;
//! let auth = AuthOrchestrator::new(&config, Arc::new(SystemBrowserLauncher::new()), config.storage());
//! auth.restore().await;
//! let profile = auth.login().await?;
//! let credential = auth.credential().ok_or(FishchiError::NotLoggedIn)?;
//! for project in auth.api().projects(&credential).await? {
//!     println!("{} ({})", project.name, profile.display_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod prelude;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
