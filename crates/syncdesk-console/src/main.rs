use clap::Parser;
use syncdesk_core::ConsoleConfig;

mod api;
mod cli;
mod commands;
mod prompt;
mod watch;

use cli::{Cli, Commands, SessionAction};
use commands::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "syncdesk_console=info,syncdesk_session=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // load config: --config > SYNCDESK_CONFIG env > ~/.syncdesk/console.toml
    let config_path = cli.config.clone().or_else(|| std::env::var("SYNCDESK_CONFIG").ok());
    let config = ConsoleConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        ConsoleConfig::default()
    });

    match cli.command {
        Commands::Schedule {
            expr,
            last_run,
            count,
            json,
        } => {
            let count = count.unwrap_or(config.schedule.occurrence_count);
            commands::schedule(&expr, last_run, count, json)
        }
        Commands::Jobs {
            page,
            page_size,
            json,
        } => {
            let ctx = Context::open(config)?;
            commands::jobs(&ctx, page, page_size, json).await
        }
        Commands::Session { action } => {
            let ctx = Context::open(config)?;
            match action {
                SessionAction::Status { json } => commands::session_status(&ctx, json),
                SessionAction::Login { username, password } => {
                    commands::session_login(&ctx, &username, password).await
                }
                SessionAction::Logout => commands::session_logout(&ctx).await,
            }
        }
        Commands::Watch => {
            let ctx = Context::open(config)?;
            watch::run(&ctx).await
        }
    }
}
