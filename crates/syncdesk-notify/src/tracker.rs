use tracing::{debug, warn};

use crate::error::Result;

/// Anything carrying a server-assigned, increasing identifier.
pub trait Identified {
    fn id(&self) -> u64;
}

impl Identified for u64 {
    fn id(&self) -> u64 {
        *self
    }
}

fn max_id<T: Identified>(items: &[T]) -> Option<u64> {
    items.iter().map(Identified::id).max()
}

/// Derives an unread count from successive polls of the same list.
///
/// The first ingest only establishes the baseline, so nothing shows as
/// unread on first paint. After that, every item whose id is above the
/// baseline counts as unread. Only [`mark_all_seen`](Self::mark_all_seen)
/// moves the baseline, and it never moves backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnseenItemTracker {
    baseline: Option<u64>,
    initialized: bool,
    unread: usize,
}

impl UnseenItemTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one successful poll. Returns the unread count.
    pub fn ingest<T: Identified>(&mut self, items: &[T]) -> usize {
        if !self.initialized {
            self.initialized = true;
            self.baseline = max_id(items);
            self.unread = 0;
            debug!(baseline = ?self.baseline, "unseen baseline established");
            return 0;
        }

        self.unread = match self.baseline {
            Some(baseline) => items.iter().filter(|i| i.id() > baseline).count(),
            // The first poll was empty; everything since is new.
            None => items.len(),
        };
        self.unread
    }

    /// Feed a poll outcome. A failed poll keeps the previous baseline and
    /// unread count.
    pub fn ingest_poll<T: Identified>(&mut self, poll: Result<Vec<T>>) -> usize {
        match poll {
            Ok(items) => self.ingest(&items),
            Err(e) => {
                warn!(error = %e, unread = self.unread, "keeping previous unread state");
                self.unread
            }
        }
    }

    /// The list was shown to the user: everything in it is now seen.
    ///
    /// An empty list leaves an uninitialized tracker uninitialized, so the
    /// next successful ingest still only sets the baseline.
    pub fn mark_all_seen<T: Identified>(&mut self, items: &[T]) -> usize {
        if let Some(max) = max_id(items) {
            self.baseline = Some(self.baseline.map_or(max, |b| b.max(max)));
            self.initialized = true;
        }
        self.unread = 0;
        0
    }

    /// Local decrement after the user acted on one item, floored at zero.
    /// Not tied to any particular item; the next ingest recomputes the count.
    pub fn mark_one_consumed(&mut self) -> usize {
        self.unread = self.unread.saturating_sub(1);
        self.unread
    }

    pub fn baseline(&self) -> Option<u64> {
        self.baseline
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn unread(&self) -> usize {
        self.unread
    }
}
