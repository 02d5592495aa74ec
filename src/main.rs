//! Fishchi CLI binary entry point.

use std::io;

use fishchi::cli::{format_error_help, AuthCommands, Cli, Commands};
use fishchi::config::FishchiConfig;
use fishchi::error::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logging goes to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse_args();

    if let Err(e) = run(cli).await {
        if e.is_user_cancelled() {
            println!("Login cancelled.");
            return;
        }
        eprintln!("Error: {}", format_error_help(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = FishchiConfig::from_env()?;
    tracing::debug!(api = config.api_base_url(), "configuration loaded");

    match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login => fishchi::cli::auth::handle_login(&config).await,
            AuthCommands::Status => fishchi::cli::auth::handle_status(&config).await,
            AuthCommands::Logout => fishchi::cli::auth::handle_logout(&config).await,
        },
        Commands::Projects => fishchi::cli::library::handle_projects(&config).await,
        Commands::Sources(args) => {
            fishchi::cli::library::handle_sources(&config, &args.project_id).await
        }
        Commands::Notes(args) => {
            fishchi::cli::library::handle_notes(&config, &args.project_id, &args.source_id).await
        }
    }
}
