//! CLI entry point for Fishchi.

pub mod auth;
pub mod library;

use clap::{Parser, Subcommand};

use crate::error::FishchiError;

/// Fishchi research library CLI
#[derive(Parser, Debug)]
#[command(name = "fishchi", version, about = "Sign in to Fishchi and browse saved research")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication management
    Auth(AuthArgs),
    /// List your projects
    Projects,
    /// List the sources of a project
    Sources(SourcesArgs),
    /// List the notes taken on a source
    Notes(NotesArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands for login, status, and logout.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in through the browser
    Login,
    /// Show authentication status
    Status,
    /// Sign out and forget the stored credential
    Logout,
}

/// Arguments for `fishchi sources`.
#[derive(Parser, Debug)]
pub struct SourcesArgs {
    /// Project id
    pub project_id: String,
}

/// Arguments for `fishchi notes`.
#[derive(Parser, Debug)]
pub struct NotesArgs {
    /// Project id
    pub project_id: String,
    /// Source id
    pub source_id: String,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Map a [`FishchiError`] to a user-facing message with actionable guidance.
pub fn format_error_help(err: &FishchiError) -> String {
    match err {
        FishchiError::NotLoggedIn => "Not logged in. Run: fishchi auth login".to_string(),
        err if err.is_unauthorized() => {
            "Your session has expired. Run: fishchi auth login".to_string()
        }
        FishchiError::Configuration(msg) => {
            format!("Configuration error: {msg}. Check your .env or FISHCHI_* variables")
        }
        other => format!("{other}"),
    }
}
