//! Job lifecycle: records, storage, event stream, and background polling.

pub mod events;
pub mod registry;
pub mod state;
pub mod tracker;

pub use events::{JobEvent, JobEventBroadcaster};
pub use registry::{InMemoryJobRegistry, JobCounts, JobRegistry};
pub use state::{JobRecord, JobStatus, JobStatusView};
pub use tracker::{JobTracker, PollingPolicy};
