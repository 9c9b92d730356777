use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::{debug, info};

use crate::{
    error::Result,
    tracker::{Identified, UnseenItemTracker},
};

/// Source of the notification list.
#[async_trait]
pub trait NotificationFeed: Send + Sync {
    type Item: Identified + Clone + Send + Sync + 'static;

    async fn fetch(&self) -> Result<Vec<Self::Item>>;
}

#[async_trait]
impl<F: NotificationFeed + ?Sized> NotificationFeed for Arc<F> {
    type Item = F::Item;

    async fn fetch(&self) -> Result<Vec<Self::Item>> {
        (**self).fetch().await
    }
}

struct CenterState<T> {
    tracker: UnseenItemTracker,
    latest: Vec<T>,
}

struct Shared<T> {
    state: Mutex<CenterState<T>>,
    unread_tx: watch::Sender<usize>,
}

/// One tracker shared between the poll loop and the UI.
///
/// The loop feeds polls in through [`run`](Self::run); the UI reads the
/// unread count (or watches it), opens the list and consumes items. Unread
/// changes are published on a `watch` channel.
pub struct NotificationCenter<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for NotificationCenter<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Identified + Clone + Send + Sync + 'static> Default for NotificationCenter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identified + Clone + Send + Sync + 'static> NotificationCenter<T> {
    pub fn new() -> Self {
        let (unread_tx, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CenterState {
                    tracker: UnseenItemTracker::new(),
                    latest: Vec::new(),
                }),
                unread_tx,
            }),
        }
    }

    /// Receiver that observes every change of the unread count.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.shared.unread_tx.subscribe()
    }

    pub fn unread(&self) -> usize {
        self.shared.state.lock().unwrap().tracker.unread()
    }

    pub fn baseline(&self) -> Option<u64> {
        self.shared.state.lock().unwrap().tracker.baseline()
    }

    /// Items from the last successful poll.
    pub fn latest(&self) -> Vec<T> {
        self.shared.state.lock().unwrap().latest.clone()
    }

    /// Apply one poll outcome and publish the resulting unread count.
    pub fn apply(&self, poll: Result<Vec<T>>) -> usize {
        let unread = {
            let mut state = self.shared.state.lock().unwrap();
            match poll {
                Ok(items) => {
                    let unread = state.tracker.ingest(&items);
                    state.latest = items;
                    unread
                }
                Err(e) => state.tracker.ingest_poll::<T>(Err(e)),
            }
        };
        self.publish(unread);
        unread
    }

    /// Fetch once from `feed` and apply the outcome.
    pub async fn poll_once<F>(&self, feed: &F) -> usize
    where
        F: NotificationFeed<Item = T> + ?Sized,
    {
        let poll = feed.fetch().await;
        self.apply(poll)
    }

    /// The user opened the list: mark everything shown as seen and return it.
    pub fn open(&self) -> Vec<T> {
        let items = {
            let mut state = self.shared.state.lock().unwrap();
            let CenterState { tracker, latest } = &mut *state;
            tracker.mark_all_seen(latest);
            latest.clone()
        };
        self.publish(0);
        items
    }

    /// The user acted on one notification.
    pub fn consume_one(&self) -> usize {
        let unread = self.shared.state.lock().unwrap().tracker.mark_one_consumed();
        self.publish(unread);
        unread
    }

    /// Poll `feed` every `period` until `shutdown` flips to `true` or its
    /// sender goes away. The first poll happens immediately.
    pub async fn run<F>(&self, feed: F, period: Duration, mut shutdown: watch::Receiver<bool>)
    where
        F: NotificationFeed<Item = T>,
    {
        info!(period_secs = period.as_secs(), "notification polling started");
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let unread = self.poll_once(&feed).await;
                    debug!(unread, "notification poll applied");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("notification polling stopped");
                        break;
                    }
                }
            }
        }
    }

    fn publish(&self, unread: usize) {
        self.shared.unread_tx.send_if_modified(|current| {
            if *current == unread {
                return false;
            }
            *current = unread;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use std::collections::VecDeque;

    /// Replays scripted poll outcomes, then keeps returning the last list.
    struct ScriptedFeed {
        script: Mutex<VecDeque<Result<Vec<u64>>>>,
        last: Mutex<Vec<u64>>,
        calls: Arc<Mutex<usize>>,
    }

    impl ScriptedFeed {
        fn new(script: Vec<Result<Vec<u64>>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(Vec::new()),
                calls: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl NotificationFeed for ScriptedFeed {
        type Item = u64;

        async fn fetch(&self) -> Result<Vec<u64>> {
            *self.calls.lock().unwrap() += 1;
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(items)) => {
                    *self.last.lock().unwrap() = items.clone();
                    Ok(items)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last.lock().unwrap().clone()),
            }
        }
    }

    fn ids(n: u64) -> Vec<u64> {
        (1..=n).rev().collect()
    }

    #[test]
    fn open_marks_latest_seen() {
        let center = NotificationCenter::<u64>::new();
        center.apply(Ok(ids(10)));
        assert_eq!(center.apply(Ok(ids(12))), 2);

        let shown = center.open();
        assert_eq!(shown.len(), 12);
        assert_eq!(center.unread(), 0);
        assert_eq!(center.baseline(), Some(12));
        assert_eq!(center.apply(Ok(ids(12))), 0);
    }

    #[test]
    fn failed_poll_keeps_latest_items() {
        let center = NotificationCenter::<u64>::new();
        center.apply(Ok(ids(3)));
        center.apply(Ok(ids(5)));
        assert_eq!(center.apply(Err(NotifyError::PollFailure("502".into()))), 2);
        assert_eq!(center.latest(), ids(5));
    }

    #[test]
    fn open_after_failed_first_poll_does_not_badge_first_success() {
        let center = NotificationCenter::<u64>::new();
        center.apply(Err(NotifyError::PollFailure("timeout".into())));
        assert!(center.open().is_empty());
        assert_eq!(center.apply(Ok(ids(10))), 0);
        assert_eq!(center.baseline(), Some(10));
        assert_eq!(center.apply(Ok(ids(11))), 1);
    }

    #[test]
    fn unread_changes_are_published() {
        let center = NotificationCenter::<u64>::new();
        let mut rx = center.subscribe();
        center.apply(Ok(ids(1)));
        assert!(!rx.has_changed().unwrap());

        center.apply(Ok(ids(4)));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 3);

        center.consume_one();
        assert_eq!(*rx.borrow_and_update(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_until_shutdown() {
        let feed = ScriptedFeed::new(vec![
            Ok(ids(10)),
            Err(NotifyError::PollFailure("timeout".into())),
            Ok(ids(12)),
        ]);
        let calls = Arc::clone(&feed.calls);
        let center = NotificationCenter::<u64>::new();
        let (stop_tx, stop_rx) = watch::channel(false);

        let runner = {
            let center = center.clone();
            tokio::spawn(async move { center.run(feed, Duration::from_secs(30), stop_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(*calls.lock().unwrap(), 3);
        assert_eq!(center.unread(), 2);

        stop_tx.send(true).unwrap();
        runner.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_when_shutdown_sender_dropped() {
        let center = NotificationCenter::<u64>::new();
        let (stop_tx, stop_rx) = watch::channel(false);
        let runner = {
            let center = center.clone();
            tokio::spawn(async move {
                center
                    .run(ScriptedFeed::new(vec![]), Duration::from_secs(30), stop_rx)
                    .await
            })
        };
        drop(stop_tx);
        runner.await.unwrap();
    }
}
