use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tracker::Identified;

/// Job summary embedded in a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// One job execution log, as served by `GET /notifications` (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogNotification {
    pub id: u64,
    pub job_id: u64,
    /// `running`, `completed` or `failed`.
    pub status: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub job: Option<JobRef>,
}

impl JobLogNotification {
    pub fn job_name(&self) -> &str {
        self.job
            .as_ref()
            .map(|j| j.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("unnamed job")
    }

    pub fn failed(&self) -> bool {
        self.status == "failed"
    }
}

impl Identified for JobLogNotification {
    fn id(&self) -> u64 {
        self.id
    }
}
