//! Background polling of accepted jobs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::events::JobEventBroadcaster;
use super::registry::JobRegistry;
use super::state::JobRecord;
use crate::config::PollingConfig;
use crate::error::ErrorCode;
use crate::providers::Adapter;
use crate::types::Modality;

/// Shortest poll interval the tracker will run with. A zero period would
/// stop the ticker from ever firing.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll interval and wall-clock budgets applied to every tracked job.
#[derive(Debug, Clone)]
pub struct PollingPolicy {
    interval: Duration,
    budgets: HashMap<Modality, Duration>,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl PollingPolicy {
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval().max(MIN_POLL_INTERVAL),
            budgets: Modality::ALL
                .iter()
                .map(|&modality| (modality, config.budget(modality)))
                .collect(),
        }
    }

    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            warn!(
                "Poll interval {:?} is below the minimum, using {:?}",
                interval, MIN_POLL_INTERVAL
            );
        }
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_budget(mut self, modality: Modality, budget: Duration) -> Self {
        self.budgets.insert(modality, budget);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn budget(&self, modality: Modality) -> Duration {
        self.budgets
            .get(&modality)
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// Owns one poller task per job and writes every state change to the
/// registry and the event stream.
#[derive(Clone)]
pub struct JobTracker {
    registry: Arc<dyn JobRegistry>,
    events: JobEventBroadcaster,
    policy: PollingPolicy,
}

impl JobTracker {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        events: JobEventBroadcaster,
        policy: PollingPolicy,
    ) -> Self {
        Self {
            registry,
            events,
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<dyn JobRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &JobEventBroadcaster {
        &self.events
    }

    pub fn policy(&self) -> &PollingPolicy {
        &self.policy
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.registry.get(job_id)
    }

    /// Stores the record and starts polling `adapter` until the job finishes
    /// or its budget runs out. The handle resolves to the final record.
    pub fn track(&self, record: JobRecord, adapter: Arc<dyn Adapter>) -> JoinHandle<JobRecord> {
        self.store(&record);

        let poller = Poller {
            registry: Arc::clone(&self.registry),
            events: self.events.clone(),
            interval: self.policy.interval(),
            budget: self.policy.budget(record.modality),
            adapter,
        };
        tokio::spawn(poller.run(record))
    }

    fn store(&self, record: &JobRecord) {
        self.registry.set(record.clone());
        self.events.publish(record);
    }
}

struct Poller {
    registry: Arc<dyn JobRegistry>,
    events: JobEventBroadcaster,
    interval: Duration,
    budget: Duration,
    adapter: Arc<dyn Adapter>,
}

impl Poller {
    async fn run(self, mut record: JobRecord) -> JobRecord {
        info!(
            "Tracking job {} ({} task {}, budget {:?})",
            record.job_id,
            self.adapter.name(),
            record.task_id,
            self.budget
        );

        let started = Instant::now();
        let deadline = started + self.budget;
        let mut ticker = time::interval_at(started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !record.is_terminal() {
            tokio::select! {
                biased;
                _ = time::sleep_until(deadline) => {
                    self.time_out(&mut record);
                    break;
                }
                _ = ticker.tick() => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let polled = time::timeout(remaining, self.adapter.poll(&record.task_id)).await;
            let elapsed = started.elapsed();

            match polled {
                Err(_) => {
                    self.time_out(&mut record);
                    break;
                }
                Ok(Ok(raw)) => {
                    debug!("Job {} polled: {:?}", record.job_id, raw.state);
                    if record.apply(&raw, elapsed, self.budget) {
                        self.save(&record);
                    }
                }
                Ok(Err(e)) if e.is_retryable_poll() => {
                    warn!("Poll of job {} failed, will retry: {}", record.job_id, e);
                }
                Ok(Err(e)) => {
                    warn!("Poll of job {} failed permanently: {}", record.job_id, e);
                    if record.fail(&e.to_string(), e.code()) {
                        self.save(&record);
                    }
                }
            }
        }

        info!(
            "Job {} finished as {} after {}s",
            record.job_id,
            record.status,
            started.elapsed().as_secs()
        );
        record
    }

    fn time_out(&self, record: &mut JobRecord) {
        let message = format!(
            "{} did not finish within {:?}",
            self.adapter.name(),
            self.budget
        );
        if record.fail(&message, ErrorCode::TimeoutBudgetExceeded) {
            self.save(record);
        }
    }

    fn save(&self, record: &JobRecord) {
        self.registry.set(record.clone());
        self.events.publish(record);
    }
}
