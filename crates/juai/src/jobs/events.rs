//! Job event broadcaster for streaming status changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use super::state::{JobRecord, JobStatus};
use crate::types::ToolId;

/// One observable state change of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: String,
    pub tool: ToolId,
    pub provider: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&JobRecord> for JobEvent {
    fn from(record: &JobRecord) -> Self {
        Self {
            job_id: record.job_id.clone(),
            tool: record.tool,
            provider: record.provider.clone(),
            status: record.status,
            progress: record.progress,
            message: record.message.clone(),
            result_url: record.result_url.clone(),
            error: record.error.clone(),
            timestamp: record.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl JobEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn publish(&self, record: &JobRecord) {
        self.send(JobEvent::from(record));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
