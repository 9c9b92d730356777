//! Activity sources: evidence that the user is still present.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Interaction classes counted as user presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    /// An outgoing API request made on the user's behalf.
    Request,
}

impl ActivityKind {
    /// Every class the session controller subscribes to.
    pub const ALL: [ActivityKind; 7] = [
        ActivityKind::PointerDown,
        ActivityKind::PointerMove,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
        ActivityKind::Click,
        ActivityKind::Request,
    ];
}

/// Callback invoked for each matching activity.
pub type ActivityListener = Arc<dyn Fn(ActivityKind) + Send + Sync>;

/// Opaque handle returned by [`ActivitySource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Something that can report user activity to interested listeners.
pub trait ActivitySource: Send + Sync {
    fn subscribe(&self, kind: ActivityKind, listener: ActivityListener) -> SubscriptionId;

    /// Remove a subscription. Silent no-op for unknown ids.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// In-process [`ActivitySource`]: the surrounding application calls
/// [`ActivityHub::emit`] whenever an interaction happens.
#[derive(Default)]
pub struct ActivityHub {
    next_id: AtomicU64,
    listeners: DashMap<SubscriptionId, (ActivityKind, ActivityListener)>,
}

impl ActivityHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every listener subscribed to `kind`.
    pub fn emit(&self, kind: ActivityKind) {
        // Collect first so listeners run without a shard lock held; a
        // listener may unsubscribe (or subscribe) re-entrantly.
        let targets: Vec<ActivityListener> = self
            .listeners
            .iter()
            .filter(|entry| entry.value().0 == kind)
            .map(|entry| Arc::clone(&entry.value().1))
            .collect();
        trace!(?kind, listeners = targets.len(), "activity emitted");
        for listener in targets {
            listener(kind);
        }
    }

    /// Number of live subscriptions across all kinds.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ActivitySource for ActivityHub {
    fn subscribe(&self, kind: ActivityKind, listener: ActivityListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, (kind, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.remove(&id);
    }
}
