use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use syncdesk_session::{LogoutReason, WarningPrompt};
use tokio::sync::{oneshot, watch};

/// Inactivity warning on the terminal. Answers arrive as stdin lines,
/// routed here by the watch loop through [`answer`](Self::answer).
pub struct TerminalPrompt {
    pending: Mutex<Option<oneshot::Sender<bool>>>,
    ended_tx: watch::Sender<Option<LogoutReason>>,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        let (ended_tx, _) = watch::channel(None);
        Self {
            pending: Mutex::new(None),
            ended_tx,
        }
    }

    /// Becomes `Some(reason)` once the session is over.
    pub fn ended(&self) -> watch::Receiver<Option<LogoutReason>> {
        self.ended_tx.subscribe()
    }

    pub fn is_asking(&self) -> bool {
        self.pending
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Hand `line` to an open question. Returns `false` if none is open.
    /// An empty line keeps the session.
    pub fn answer(&self, line: &str) -> bool {
        let Some(tx) = self.pending.lock().unwrap().take() else {
            return false;
        };
        let keep = matches!(
            line.trim().to_ascii_lowercase().as_str(),
            "" | "y" | "yes" | "c" | "continue"
        );
        tx.send(keep).is_ok()
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WarningPrompt for TerminalPrompt {
    async fn confirm_continue(&self, remaining: Duration) -> bool {
        let (tx, rx) = oneshot::channel();
        *self.pending.lock().unwrap() = Some(tx);
        println!(
            "Your session ends in {} due to inactivity. Stay signed in? [Y/n]",
            human(remaining)
        );
        let keep = rx.await.unwrap_or(false);
        if !keep {
            println!("Session will end at the deadline.");
        }
        keep
    }

    fn warning_withdrawn(&self) {
        self.pending.lock().unwrap().take();
        println!("Activity detected; session renewed.");
    }

    fn session_ended(&self, reason: LogoutReason) {
        self.pending.lock().unwrap().take();
        match reason {
            LogoutReason::ExpiredOnStartup => println!("Session expired while you were away."),
            LogoutReason::Inactivity => println!("Signed out after inactivity."),
            LogoutReason::Explicit => println!("Signed out."),
        }
        self.ended_tx.send_replace(Some(reason));
    }
}

fn human(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else if secs >= 60 {
        format!("{} min {} s", secs / 60, secs % 60)
    } else {
        format!("{secs} s")
    }
}
