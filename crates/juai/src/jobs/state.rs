//! Job records and the canonical job state machine.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::dispatch::Dispatched;
use crate::error::ErrorCode;
use crate::types::{Modality, ProviderState, RawStatus, TaskId, ToolId};

pub const INITIAL_PROGRESS: u8 = 10;
const MAX_RUNNING_PROGRESS: u8 = 90;
const DEFAULT_FAILURE_MESSAGE: &str = "Provider reported a failure without details";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about one accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    pub task_id: TaskId,
    pub provider: String,
    pub tool: ToolId,
    pub modality: Modality,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub fallback_used: bool,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// A pending job for a freshly dispatched task.
    pub fn new(dispatched: &Dispatched, modality: Modality) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4().to_string(),
            task_id: dispatched.task_id.clone(),
            provider: dispatched.adapter.clone(),
            tool: dispatched.tool,
            modality,
            status: JobStatus::Pending,
            progress: INITIAL_PROGRESS,
            result_url: None,
            error: None,
            error_code: None,
            fallback_used: dispatched.fallback_used,
            message: format!("{} 생성이 시작되었습니다.", dispatched.tool.as_str().to_uppercase()),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies one poll result. Returns whether anything changed.
    ///
    /// `elapsed` and `budget` drive the progress estimate when the provider
    /// doesn't report its own.
    pub fn apply(&mut self, raw: &RawStatus, elapsed: Duration, budget: Duration) -> bool {
        if self.is_terminal() {
            return false;
        }
        let before = self.clone();

        let url = raw
            .result_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        match (raw.state, url) {
            (ProviderState::Succeeded, Some(url)) => {
                self.status = JobStatus::Completed;
                self.progress = 100;
                self.result_url = Some(url.to_string());
                self.message = "생성 완료!".to_string();
                self.completed_at = Some(Utc::now());
            }
            (ProviderState::Failed, _) => {
                let error = raw
                    .error
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .unwrap_or(DEFAULT_FAILURE_MESSAGE);
                self.mark_failed(error, ErrorCode::ProviderRejected);
            }
            // Pending, processing, unknown, or success still missing its URL
            _ => {
                self.status = JobStatus::Processing;
                let reported = raw
                    .progress
                    .unwrap_or_else(|| estimate_progress(elapsed, budget));
                let clamped = reported.clamp(INITIAL_PROGRESS, MAX_RUNNING_PROGRESS);
                self.progress = self.progress.max(clamped);
                self.message = format!("생성 중... ({}초 경과)", elapsed.as_secs());
            }
        }

        let changed = *self != before;
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Fails the job unless it already finished.
    pub fn fail(&mut self, message: &str, code: ErrorCode) -> bool {
        if self.is_terminal() {
            return false;
        }
        let message = message.trim();
        let message = if message.is_empty() {
            DEFAULT_FAILURE_MESSAGE
        } else {
            message
        };
        self.mark_failed(message, code);
        self.updated_at = Utc::now();
        true
    }

    fn mark_failed(&mut self, error: &str, code: ErrorCode) {
        self.status = JobStatus::Failed;
        self.progress = 0;
        self.error = Some(error.to_string());
        self.error_code = Some(code);
        self.message = format!("실패: {}", error);
        self.completed_at = Some(Utc::now());
    }

    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.job_id.clone(),
            status: self.status,
            progress: self.progress,
            result_url: self.result_url.clone(),
            error: self.error.clone(),
            error_code: self.error_code,
            tool: self.tool,
            provider: self.provider.clone(),
            fallback_used: self.fallback_used,
            message: self.message.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// 10% at submission rising linearly to 90% at budget exhaustion.
fn estimate_progress(elapsed: Duration, budget: Duration) -> u8 {
    if budget.is_zero() {
        return MAX_RUNNING_PROGRESS;
    }
    let fraction = (elapsed.as_secs_f64() / budget.as_secs_f64()).clamp(0.0, 1.0);
    let span = f64::from(MAX_RUNNING_PROGRESS - INITIAL_PROGRESS);
    INITIAL_PROGRESS + (span * fraction).round() as u8
}

/// What a status check returns to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub tool: ToolId,
    pub provider: String,
    pub fallback_used: bool,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}
