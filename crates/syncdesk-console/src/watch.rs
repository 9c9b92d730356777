use std::{sync::Arc, time::Duration};

use anyhow::bail;
use syncdesk_notify::{JobLogNotification, NotificationCenter};
use syncdesk_session::{Activation, ActivityKind, SessionLifecycleController};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::{info, warn};

use crate::{
    api::Origin,
    commands::Context,
    prompt::TerminalPrompt,
};

const HELP: &str = "commands: n = open notifications, c = consume one, logout, q = quit \
                    (any other line counts as activity)";

/// Interactive session: keeps the inactivity controller running, follows
/// notifications, and returns once the session ends or the user quits.
pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    let prompt = Arc::new(TerminalPrompt::new());
    let controller = ctx.controller(prompt.clone());
    let guard = match controller.activate().await {
        Activation::Monitoring(guard) => guard,
        Activation::NoSession => bail!("not signed in; run `syncdesk-console session login <USER>`"),
        Activation::Expired => return Ok(()),
        Activation::AlreadyActive => bail!("session already active"),
    };
    info!(instance = %controller.instance_id(), "watching session");
    println!("{HELP}");

    let center = NotificationCenter::<JobLogNotification>::new();
    let (stop_tx, stop_rx) = watch::channel(false);
    let poller = {
        let center = center.clone();
        let feed = ctx.api.clone();
        let period = Duration::from_secs(ctx.config.notifications.poll_interval_secs.max(1));
        tokio::spawn(async move { center.run(feed, period, stop_rx).await })
    };

    let mut unread_rx = center.subscribe();
    let mut ended_rx = prompt.ended();
    let mut unauthorized_rx = ctx.api.unauthorized();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = unread_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let unread = *unread_rx.borrow_and_update();
                println!("unread notifications: {unread}");
            }
            _ = ended_rx.changed() => break,
            changed = unauthorized_rx.changed() => {
                if changed.is_ok() && *unauthorized_rx.borrow_and_update() {
                    warn!("server rejected the session; signing out");
                    controller.logout().await;
                }
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !handle_line(ctx, &prompt, &controller, &center, &line).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = stop_tx.send(true);
    if let Err(e) = poller.await {
        warn!(error = %e, "notification poller ended abnormally");
    }
    guard.deactivate();
    Ok(())
}

/// Hand `line` to an open inactivity warning. `logout` and `q` are never
/// taken as an answer; they run as commands.
fn answers_warning(prompt: &TerminalPrompt, line: &str) -> bool {
    !matches!(line.trim(), "q" | "quit" | "logout") && prompt.answer(line)
}

/// Returns `false` when the loop should stop.
async fn handle_line(
    ctx: &Context,
    prompt: &TerminalPrompt,
    controller: &SessionLifecycleController,
    center: &NotificationCenter<JobLogNotification>,
    line: &str,
) -> bool {
    if answers_warning(prompt, line) {
        return true;
    }
    ctx.hub.emit(ActivityKind::KeyPress);

    match line.trim() {
        "q" | "quit" => return false,
        "logout" => controller.logout().await,
        "c" => println!("unread notifications: {}", center.consume_one()),
        "n" => {
            let poll = ctx
                .api
                .notifications(Origin::User)
                .await
                .map_err(|e| syncdesk_notify::NotifyError::PollFailure(e.to_string()));
            center.apply(poll);
            let items = center.open();
            if items.is_empty() {
                println!("no notifications");
            }
            for item in items {
                let when = item
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                let error = if item.failed() && !item.error.is_empty() {
                    format!(" ({})", item.error)
                } else {
                    String::new()
                };
                println!("#{:<6} {} {:<10} {}{}", item.id, when, item.status, item.job_name(), error);
            }
        }
        "?" | "help" => println!("{HELP}"),
        _ => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncdesk_session::{LogoutReason, WarningPrompt};

    #[tokio::test]
    async fn logout_and_quit_are_not_warning_answers() {
        let prompt = Arc::new(TerminalPrompt::new());
        let asking = {
            let prompt = prompt.clone();
            tokio::spawn(async move { prompt.confirm_continue(Duration::from_secs(60)).await })
        };
        while !prompt.is_asking() {
            tokio::task::yield_now().await;
        }
        for line in ["logout", "q", " quit "] {
            assert!(!answers_warning(&prompt, line), "{line:?}");
            assert!(prompt.is_asking());
        }

        prompt.session_ended(LogoutReason::Explicit);
        assert!(!asking.await.unwrap());
    }

    #[tokio::test]
    async fn other_lines_answer_open_warning() {
        let prompt = Arc::new(TerminalPrompt::new());
        let asking = {
            let prompt = prompt.clone();
            tokio::spawn(async move { prompt.confirm_continue(Duration::from_secs(60)).await })
        };
        while !prompt.is_asking() {
            tokio::task::yield_now().await;
        }
        assert!(answers_warning(&prompt, "n"));
        assert!(!asking.await.unwrap());
        assert!(!answers_warning(&prompt, "n"));
    }
}
