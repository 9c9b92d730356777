use async_trait::async_trait;
use syncdesk_notify::{
    JobLogNotification, NotificationCenter, NotificationFeed, NotifyError, Result,
    UnseenItemTracker,
};

fn log(id: u64, status: &str) -> JobLogNotification {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "job_id": id % 3 + 1,
        "status": status,
        "job": {"id": id % 3 + 1, "name": format!("job-{}", id % 3 + 1)},
    }))
    .unwrap()
}

fn newest_first(n: u64) -> Vec<JobLogNotification> {
    (1..=n).rev().map(|id| log(id, "completed")).collect()
}

#[test]
fn badge_follows_polls() {
    let mut tracker = UnseenItemTracker::new();
    assert_eq!(tracker.ingest(&newest_first(10)), 0);
    assert_eq!(tracker.baseline(), Some(10));

    let second = newest_first(12);
    assert_eq!(tracker.ingest(&second), 2);
    assert_eq!(tracker.mark_all_seen(&second), 0);
    assert_eq!(tracker.baseline(), Some(12));
    assert_eq!(tracker.unread(), 0);
}

#[test]
fn window_sliding_past_baseline() {
    // The server only returns the ten most recent logs.
    let mut tracker = UnseenItemTracker::new();
    tracker.ingest(&newest_first(10));
    let window: Vec<_> = (6..=25).rev().take(10).map(|id| log(id, "failed")).collect();
    assert_eq!(tracker.ingest(&window), 10);
}

struct Down;

#[async_trait]
impl NotificationFeed for Down {
    type Item = JobLogNotification;

    async fn fetch(&self) -> Result<Vec<JobLogNotification>> {
        Err(NotifyError::PollFailure("connection refused".into()))
    }
}

#[tokio::test]
async fn outage_keeps_badge() {
    let center = NotificationCenter::new();
    center.apply(Ok(newest_first(4)));
    center.apply(Ok(newest_first(7)));

    assert_eq!(center.poll_once(&Down).await, 3);
    assert_eq!(center.latest().len(), 7);
    assert_eq!(center.open()[0].job_name(), "job-2");
    assert_eq!(center.unread(), 0);
}
