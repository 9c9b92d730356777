use std::sync::Arc;

use anyhow::bail;
use chrono::{DateTime, Utc};
use syncdesk_core::ConsoleConfig;
use syncdesk_schedule::{describe, JobSchedule, ScheduleSummary};
use syncdesk_session::{
    Activation, ActivityHub, ActivityPersistence, SessionGuard, SessionLifecycleController,
    SessionTiming, SqliteStore, WarningPrompt,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::{api::ApiClient, prompt::TerminalPrompt};

/// Everything a command needs: config, the stored session and the API client.
pub struct Context {
    pub config: ConsoleConfig,
    pub persistence: ActivityPersistence,
    pub hub: Arc<ActivityHub>,
    pub api: Arc<ApiClient>,
}

impl Context {
    pub fn open(config: ConsoleConfig) -> anyhow::Result<Self> {
        let path = &config.storage.path;
        ensure_parent_dir(path);
        info!(path = %path, "opening session store");
        let persistence = ActivityPersistence::new(Arc::new(SqliteStore::open(path)?));
        let hub = Arc::new(ActivityHub::new());
        let api = Arc::new(ApiClient::new(&config.api, persistence.clone(), hub.clone())?);
        Ok(Self {
            config,
            persistence,
            hub,
            api,
        })
    }

    pub fn timing(&self) -> SessionTiming {
        SessionTiming::from(&self.config.session)
    }

    pub fn controller(&self, prompt: Arc<dyn WarningPrompt>) -> SessionLifecycleController {
        SessionLifecycleController::new(
            self.timing(),
            self.persistence.clone(),
            self.hub.clone(),
            self.api.clone(),
            prompt,
        )
    }

    /// Activate a controller for the length of one command, so its
    /// requests count as activity and a stale session is signed out first.
    pub async fn begin(&self) -> anyhow::Result<SessionGuard> {
        let controller = self.controller(Arc::new(TerminalPrompt::new()));
        match controller.activate().await {
            Activation::Monitoring(guard) => Ok(guard),
            Activation::NoSession => bail!("not signed in; run `syncdesk-console session login <USER>`"),
            Activation::Expired => bail!("session expired; sign in again"),
            Activation::AlreadyActive => bail!("session already active"),
        }
    }
}

pub fn schedule(
    expr: &str,
    last_run: Option<DateTime<Utc>>,
    count: usize,
    json: bool,
) -> anyhow::Result<()> {
    let job = JobSchedule {
        id: 0,
        name: String::new(),
        schedule: expr.to_string(),
        last_run,
    };
    let summary = describe(&job, Utc::now(), count);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ScheduleSummary) {
    println!("{}", summary.label);
    match &summary.next_runs {
        Some(runs) => {
            for run in runs {
                println!("  {}", run.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        None => println!("  (next runs cannot be predicted)"),
    }
}

pub async fn jobs(ctx: &Context, page: u32, page_size: u32, json: bool) -> anyhow::Result<()> {
    let _guard = ctx.begin().await?;
    let listing = ctx.api.jobs(page, page_size).await?;
    let now = Utc::now();
    let count = ctx.config.schedule.occurrence_count;

    if json {
        let rows: Vec<serde_json::Value> = listing
            .data
            .iter()
            .map(|job| {
                serde_json::json!({
                    "id": job.id,
                    "name": job.name,
                    "schedule": job.schedule,
                    "summary": describe(job, now, count),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "jobs": rows, "meta": listing.meta }))?
        );
        return Ok(());
    }

    for job in &listing.data {
        let summary = describe(job, now, count);
        let next = summary
            .next_runs
            .as_ref()
            .and_then(|runs| runs.first())
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>5}  {:<24}  {:<18}  next {}", job.id, job.name, summary.label, next);
    }
    println!(
        "page {} of {} jobs",
        listing.meta.page.max(page),
        listing.meta.total
    );
    Ok(())
}

pub fn session_status(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let snapshot = ctx.persistence.inspect(Utc::now(), &ctx.timing());
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("state: {}", snapshot.state);
    if let Some(user) = &snapshot.username {
        println!("user: {user}");
    }
    if let Some(at) = snapshot.last_activity {
        println!("last activity: {}", at.to_rfc3339());
    }
    if let Some(ms) = snapshot.remaining_ms {
        println!("remaining: {} s", ms / 1000);
    }
    Ok(())
}

pub async fn session_login(
    ctx: &Context,
    username: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            println!("Password:");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            match lines.next_line().await? {
                Some(line) => line,
                None => bail!("no password given"),
            }
        }
    };

    let resp = ctx.api.login(username, &password).await?;
    ctx.persistence.sign_in(&resp.username, Utc::now())?;
    ctx.persistence.store_token(&resp.token)?;
    info!(user = %resp.username, role = %resp.role, "signed in");

    println!("Signed in as {}.", resp.username);
    if resp.must_change_password {
        println!("The server asks you to change your password.");
    }
    Ok(())
}

pub async fn session_logout(ctx: &Context) -> anyhow::Result<()> {
    if !ctx.persistence.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    ctx.controller(Arc::new(TerminalPrompt::new())).logout().await;
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
