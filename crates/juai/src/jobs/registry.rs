//! Keyed job storage.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

use super::state::{JobRecord, JobStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Where job records live. Each record is written by the facade once and
/// then only by its own poller.
pub trait JobRegistry: Send + Sync {
    fn get(&self, job_id: &str) -> Option<JobRecord>;

    fn set(&self, record: JobRecord);

    fn list(&self) -> Vec<JobRecord>;

    fn counts(&self) -> JobCounts {
        self.list()
            .iter()
            .fold(JobCounts::default(), |mut counts, job| {
                match job.status {
                    JobStatus::Pending => counts.pending += 1,
                    JobStatus::Processing => counts.processing += 1,
                    JobStatus::Completed => counts.completed += 1,
                    JobStatus::Failed => counts.failed += 1,
                }
                counts
            })
    }

    /// Jobs that haven't reached a terminal state, oldest first.
    fn list_active(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self
            .list()
            .into_iter()
            .filter(|job| !job.is_terminal())
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }
}

/// Process-lifetime registry. Terminal jobs are kept until the process exits.
#[derive(Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobRegistry for InMemoryJobRegistry {
    fn get(&self, job_id: &str) -> Option<JobRecord> {
        let jobs = match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        jobs.get(job_id).cloned()
    }

    fn set(&self, record: JobRecord) {
        let mut jobs = match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        jobs.insert(record.job_id.clone(), record);
    }

    fn list(&self) -> Vec<JobRecord> {
        let jobs = match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let mut list: Vec<JobRecord> = jobs.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }
}
