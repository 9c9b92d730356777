use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use syncdesk_core::clock::{Clock, SystemClock};
use tokio::{runtime::Handle, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    activity::{ActivityKind, ActivitySource, SubscriptionId},
    error::{Result, SessionError},
    persistence::ActivityPersistence,
    types::{LogoutReason, SessionState, SessionTiming},
};

/// Remote half of a logout: tells the server to drop the session.
///
/// Failures are logged and ignored; local cleanup always runs.
#[async_trait]
pub trait LogoutTransport: Send + Sync {
    async fn logout(&self) -> Result<()>;
}

/// Presentation half of the session lifecycle, supplied by the caller.
#[async_trait]
pub trait WarningPrompt: Send + Sync {
    /// Ask whether to keep the session. `true` restarts both timers.
    ///
    /// The future is dropped if the session ends (or activity renews it)
    /// before the user answers.
    async fn confirm_continue(&self, remaining: Duration) -> bool;

    /// Activity renewed the session while the warning was on screen.
    fn warning_withdrawn(&self) {}

    /// The session is over; hand control to the sign-in entry point.
    fn session_ended(&self, reason: LogoutReason);
}

/// Outcome of [`SessionLifecycleController::activate`].
#[must_use]
pub enum Activation {
    /// No session marker: nothing was scheduled.
    NoSession,
    /// The session had already run out; logout ran before returning.
    Expired,
    /// The controller is already monitoring through an earlier guard.
    AlreadyActive,
    /// Timers and activity subscriptions are live until the guard is released.
    Monitoring(SessionGuard),
}

impl std::fmt::Debug for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Activation::NoSession => "NoSession",
            Activation::Expired => "Expired",
            Activation::AlreadyActive => "AlreadyActive",
            Activation::Monitoring(_) => "Monitoring",
        };
        f.write_str(s)
    }
}

struct ControlState {
    state: SessionState,
    /// True between activation and teardown/expiry; gates every re-arm.
    armed: bool,
    /// Bumped on every re-arm and teardown. Timer tasks carry the epoch
    /// they were armed under and stand down if it has moved on.
    epoch: u64,
    runtime: Option<Handle>,
    warning: Option<JoinHandle<()>>,
    logout: Option<JoinHandle<()>>,
}

impl ControlState {
    fn cancel_timers(&mut self) {
        if let Some(h) = self.warning.take() {
            h.abort();
        }
        if let Some(h) = self.logout.take() {
            h.abort();
        }
    }
}

struct Inner {
    instance: Uuid,
    timing: SessionTiming,
    persistence: ActivityPersistence,
    source: Arc<dyn ActivitySource>,
    transport: Arc<dyn LogoutTransport>,
    prompt: Arc<dyn WarningPrompt>,
    clock: Arc<dyn Clock>,
    control: Mutex<ControlState>,
}

/// Logs the user out after a period of inactivity, warning them first.
///
/// Cheap to clone; clones share one set of timers.
#[derive(Clone)]
pub struct SessionLifecycleController {
    inner: Arc<Inner>,
}

impl SessionLifecycleController {
    /// Build an idle controller. Nothing is read or scheduled until
    /// [`activate`](Self::activate).
    pub fn new(
        timing: SessionTiming,
        persistence: ActivityPersistence,
        source: Arc<dyn ActivitySource>,
        transport: Arc<dyn LogoutTransport>,
        prompt: Arc<dyn WarningPrompt>,
    ) -> Self {
        Self::with_clock(timing, persistence, source, transport, prompt, Arc::new(SystemClock))
    }

    pub fn with_clock(
        timing: SessionTiming,
        persistence: ActivityPersistence,
        source: Arc<dyn ActivitySource>,
        transport: Arc<dyn LogoutTransport>,
        prompt: Arc<dyn WarningPrompt>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                instance: Uuid::new_v4(),
                timing,
                persistence,
                source,
                transport,
                prompt,
                clock,
                control: Mutex::new(ControlState {
                    state: SessionState::Inactive,
                    armed: false,
                    epoch: 0,
                    runtime: None,
                    warning: None,
                    logout: None,
                }),
            }),
        }
    }

    /// Identifier carried in this instance's log lines.
    pub fn instance_id(&self) -> Uuid {
        self.inner.instance
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Number of armed timers (warning and logout), at most two.
    pub fn live_timers(&self) -> usize {
        let ctl = self.inner.lock();
        [&ctl.warning, &ctl.logout]
            .iter()
            .filter(|h| h.as_ref().is_some_and(|h| !h.is_finished()))
            .count()
    }

    /// Start monitoring.
    ///
    /// Without a session marker this does nothing. If the stored activity
    /// time is older than the timeout the logout runs right here, before
    /// any timer is armed. Otherwise both timers are armed and every
    /// activity class is subscribed until the returned guard is released.
    pub async fn activate(&self) -> Activation {
        let inner = &self.inner;
        if !inner.persistence.is_authenticated() {
            debug!(
                instance = %inner.instance,
                error = %SessionError::SessionAbsent,
                "controller stays idle"
            );
            return Activation::NoSession;
        }

        let state = inner.lock().state;
        match state {
            SessionState::Inactive => {}
            SessionState::Expired => return Activation::Expired,
            SessionState::Monitoring | SessionState::Warning => {
                warn!(
                    instance = %inner.instance,
                    error = %SessionError::AlreadyActive,
                    "activate called twice; ignoring"
                );
                return Activation::AlreadyActive;
            }
        }

        let now = inner.clock.now();
        if let Some(last) = inner.persistence.last_activity() {
            let idle_ms = (now - last).num_milliseconds();
            if idle_ms > inner.timing.timeout.as_millis() as i64 {
                info!(instance = %inner.instance, idle_ms, "session expired while away");
                inner.end_session(LogoutReason::ExpiredOnStartup, None).await;
                return Activation::Expired;
            }
        }

        {
            let mut ctl = inner.lock();
            if ctl.state != SessionState::Inactive {
                return Activation::AlreadyActive;
            }
            ctl.runtime = Some(Handle::current());
            ctl.armed = true;
            ctl.state = SessionState::Monitoring;
        }

        let subscriptions = ActivityKind::ALL
            .iter()
            .map(|&kind| {
                let weak = Arc::downgrade(inner);
                inner.source.subscribe(
                    kind,
                    Arc::new(move |kind| {
                        if let Some(inner) = weak.upgrade() {
                            inner.on_activity(kind);
                        }
                    }),
                )
            })
            .collect();

        inner.reset_timeout();
        info!(
            instance = %inner.instance,
            timeout_ms = inner.timing.timeout.as_millis() as u64,
            "session monitoring started"
        );

        Activation::Monitoring(SessionGuard {
            inner: Arc::clone(inner),
            subscriptions,
            released: false,
        })
    }

    /// Record activity now and restart both timers, superseding any
    /// pending ones. No-op unless the controller is monitoring.
    pub fn reset_timeout(&self) {
        self.inner.reset_timeout();
    }

    /// End the session on request. Idempotent.
    pub async fn logout(&self) {
        self.inner.end_session(LogoutReason::Explicit, None).await;
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.control.lock().expect("session control mutex poisoned")
    }

    fn on_activity(self: &Arc<Self>, kind: ActivityKind) {
        {
            let ctl = self.lock();
            if !ctl.armed {
                return;
            }
            if ctl.state == SessionState::Warning && self.timing.hold_activity_during_warning {
                debug!(instance = %self.instance, ?kind, "activity ignored while warning is open");
                return;
            }
        }
        debug!(instance = %self.instance, ?kind, "activity");
        self.reset_timeout();
    }

    fn reset_timeout(self: &Arc<Self>) {
        let withdrawn = {
            let mut ctl = self.lock();
            let was_warning = ctl.state == SessionState::Warning;
            if !self.rearm(&mut ctl) {
                return;
            }
            was_warning
        };
        if withdrawn {
            self.prompt.warning_withdrawn();
        }
    }

    /// Cancel both timers, persist the activity time and arm fresh timers.
    /// Caller holds the control lock.
    fn rearm(self: &Arc<Self>, ctl: &mut ControlState) -> bool {
        if !ctl.armed || ctl.state == SessionState::Expired {
            return false;
        }
        let Some(runtime) = ctl.runtime.clone() else {
            return false;
        };

        ctl.cancel_timers();
        ctl.epoch += 1;
        ctl.state = SessionState::Monitoring;
        let epoch = ctl.epoch;

        if let Err(e) = self.persistence.record_activity(self.clock.now()) {
            warn!(instance = %self.instance, error = %e, "failed to persist activity timestamp");
        }

        // Deadlines are fixed here rather than when the task first runs.
        let armed_at = Instant::now();
        if let Some(delay) = self.timing.warning_delay() {
            let inner = Arc::clone(self);
            ctl.warning = Some(runtime.spawn(async move {
                tokio::time::sleep_until(armed_at + delay).await;
                inner.on_warning(epoch).await;
            }));
        }
        let inner = Arc::clone(self);
        let timeout = self.timing.timeout;
        ctl.logout = Some(runtime.spawn(async move {
            tokio::time::sleep_until(armed_at + timeout).await;
            inner.on_logout_timer(epoch).await;
        }));
        true
    }

    async fn on_warning(self: Arc<Self>, epoch: u64) {
        {
            let mut ctl = self.lock();
            if ctl.epoch != epoch || !ctl.armed || ctl.state != SessionState::Monitoring {
                return;
            }
            ctl.state = SessionState::Warning;
        }

        let remaining = self.timing.warning_lead.min(self.timing.timeout);
        info!(
            instance = %self.instance,
            remaining_ms = remaining.as_millis() as u64,
            "inactivity warning surfaced"
        );

        if !self.prompt.confirm_continue(remaining).await {
            debug!(instance = %self.instance, "warning declined; logout stays armed");
            return;
        }

        let mut ctl = self.lock();
        if ctl.epoch != epoch || ctl.state != SessionState::Warning {
            return;
        }
        // This task is the warning timer; detach it instead of aborting itself.
        drop(ctl.warning.take());
        if self.rearm(&mut ctl) {
            info!(instance = %self.instance, "session continued from warning");
        }
    }

    async fn on_logout_timer(self: Arc<Self>, epoch: u64) {
        self.end_session(LogoutReason::Inactivity, Some(epoch)).await;
    }

    /// Run the logout sequence once.
    ///
    /// `timer_epoch` is set when the logout timer itself calls in: the call
    /// is dropped if that timer was superseded, and the timer's own handle
    /// is detached rather than aborted so the sequence runs to completion.
    async fn end_session(&self, reason: LogoutReason, timer_epoch: Option<u64>) {
        {
            let mut ctl = self.lock();
            if ctl.state == SessionState::Expired {
                return;
            }
            if let Some(epoch) = timer_epoch {
                if ctl.epoch != epoch || !ctl.armed {
                    return;
                }
            }
            ctl.state = SessionState::Expired;
            ctl.armed = false;
            ctl.epoch += 1;
            if let Some(h) = ctl.warning.take() {
                h.abort();
            }
            if let Some(h) = ctl.logout.take() {
                if timer_epoch.is_none() {
                    h.abort();
                }
            }
        }

        info!(instance = %self.instance, ?reason, "ending session");
        if let Err(e) = self.transport.logout().await {
            warn!(instance = %self.instance, error = %e, "remote logout failed; clearing local state anyway");
        }
        if let Err(e) = self.persistence.clear_identity() {
            warn!(instance = %self.instance, error = %e, "failed to clear persisted identity");
        }
        self.prompt.session_ended(reason);
    }
}

/// Scoped ownership of a monitoring session.
///
/// Releasing the guard (explicitly or by drop) cancels both timers and
/// removes every activity subscription in one step.
pub struct SessionGuard {
    inner: Arc<Inner>,
    subscriptions: Vec<SubscriptionId>,
    released: bool,
}

impl SessionGuard {
    pub fn deactivate(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        {
            let mut ctl = self.inner.lock();
            ctl.armed = false;
            ctl.epoch += 1;
            ctl.cancel_timers();
            if ctl.state != SessionState::Expired {
                ctl.state = SessionState::Inactive;
            }
        }
        // Late listener calls see `armed == false` and do nothing.
        for id in self.subscriptions.drain(..) {
            self.inner.source.unsubscribe(id);
        }
        info!(instance = %self.inner.instance, "session monitoring stopped");
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
