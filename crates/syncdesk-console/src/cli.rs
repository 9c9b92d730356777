use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "syncdesk-console")]
#[command(about = "Terminal companion for the sync master console")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to $SYNCDESK_CONFIG, then ~/.syncdesk/console.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Label a schedule expression and predict its next runs
    Schedule {
        /// Cron-like expression or legacy preset name (quote it)
        #[arg(value_name = "EXPR")]
        expr: String,

        /// Time of the last run (RFC 3339)
        #[arg(long, value_name = "RFC3339")]
        last_run: Option<DateTime<Utc>>,

        /// Number of runs to predict
        #[arg(long)]
        count: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// List jobs from the server with their schedule labels
    Jobs {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        page_size: u32,

        #[arg(long)]
        json: bool,
    },

    /// Inspect or change the stored session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Keep the session alive interactively and follow notifications
    Watch,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Show the session state reconstructed from stored values
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Sign in and store the session
    Login {
        #[arg(value_name = "USER")]
        username: String,

        /// Password (read from stdin when omitted)
        #[arg(long, env = "SYNCDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and clear the stored session
    Logout,
}
