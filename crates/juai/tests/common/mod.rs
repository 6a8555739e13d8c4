//! Shared test utilities for juai integration tests.
//!
//! This module provides:
//! - `FakeAdapter`, a scripted in-process provider
//! - helpers for assembling a `Studio` around fake adapters

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use juai::dispatch::{FallbackDispatcher, Route};
use juai::jobs::{JobEvent, JobStatus, PollingPolicy};
use juai::{
    Adapter, AdapterError, IntentRouter, Modality, ProviderRequest, RawStatus, Studio, TaskId,
    ToolId,
};

/// What a fake adapter saw on submit.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub prompt: String,
    pub enhanced_prompt: String,
    pub style_id: String,
}

/// A provider whose submit and poll results are scripted up front. Once the
/// poll script runs out the last entry repeats; with no script at all every
/// poll succeeds with a result URL.
pub struct FakeAdapter {
    name: String,
    tool: ToolId,
    available: bool,
    submit_script: Mutex<VecDeque<Result<TaskId, AdapterError>>>,
    poll_script: Mutex<VecDeque<Result<RawStatus, AdapterError>>>,
    last_poll: Mutex<Option<Result<RawStatus, AdapterError>>>,
    submits: AtomicUsize,
    polls: AtomicUsize,
    seen: Mutex<Vec<SeenRequest>>,
}

impl FakeAdapter {
    pub fn new(name: &str, tool: ToolId) -> Self {
        Self {
            name: name.to_string(),
            tool,
            available: true,
            submit_script: Mutex::new(VecDeque::new()),
            poll_script: Mutex::new(VecDeque::new()),
            last_poll: Mutex::new(None),
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn submit_fails(self, error: AdapterError) -> Self {
        self.submit_script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn polls_with(self, script: Vec<Result<RawStatus, AdapterError>>) -> Self {
        self.poll_script.lock().unwrap().extend(script);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn result_url(&self) -> String {
        format!("https://cdn.example/{}.mp4", self.name.replace(':', "-"))
    }
}

#[async_trait]
impl Adapter for FakeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn tool(&self) -> ToolId {
        self.tool
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn submit(&self, request: &ProviderRequest<'_>) -> Result<TaskId, AdapterError> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().unwrap().push(SeenRequest {
            prompt: request.prompt.to_string(),
            enhanced_prompt: request.enhanced_prompt(),
            style_id: request.style.id.to_string(),
        });
        match self.submit_script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(TaskId::new(format!("{}-task-{}", self.name, n))),
        }
    }

    async fn poll(&self, _task_id: &TaskId) -> Result<RawStatus, AdapterError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.poll_script.lock().unwrap().pop_front();
        let mut last = self.last_poll.lock().unwrap();
        if let Some(next) = next {
            *last = Some(next);
        }
        last.clone()
            .unwrap_or_else(|| Ok(RawStatus::succeeded(self.result_url())))
    }
}

pub fn transient(provider: &str) -> AdapterError {
    AdapterError::Transient {
        provider: provider.to_string(),
        message: "HTTP 503: upstream unavailable".to_string(),
    }
}

pub fn auth(provider: &str) -> AdapterError {
    AdapterError::AuthOrQuota {
        provider: provider.to_string(),
        status: 402,
        message: "insufficient credits".to_string(),
    }
}

/// 1s polls and a 30s budget for every modality.
pub fn fast_policy() -> PollingPolicy {
    Modality::ALL.iter().fold(
        PollingPolicy::default().with_interval(Duration::from_secs(1)),
        |policy, &modality| policy.with_budget(modality, Duration::from_secs(30)),
    )
}

/// Keyword-only studio over the given routes.
pub fn studio(routes: Vec<Route>) -> Studio {
    Studio::builder()
        .with_router(IntentRouter::keyword_only())
        .with_dispatcher(FallbackDispatcher::new(routes))
        .with_policy(fast_policy())
        .build()
}

pub fn route(tool: ToolId, preferred: &Arc<FakeAdapter>) -> Route {
    Route::new(tool, Arc::clone(preferred) as Arc<dyn Adapter>)
}

pub fn route_with_fallback(
    tool: ToolId,
    preferred: &Arc<FakeAdapter>,
    fallback: &Arc<FakeAdapter>,
) -> Route {
    route(tool, preferred).with_fallback(Arc::clone(fallback) as Arc<dyn Adapter>)
}

/// Waits for the first terminal event of `job_id`.
pub async fn wait_terminal(rx: &mut broadcast::Receiver<JobEvent>, job_id: &str) -> JobEvent {
    loop {
        let event = rx.recv().await.expect("event stream closed");
        if event.job_id == job_id
            && matches!(event.status, JobStatus::Completed | JobStatus::Failed)
        {
            return event;
        }
    }
}
