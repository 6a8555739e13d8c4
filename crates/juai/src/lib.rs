pub mod config;
pub mod dispatch;
pub mod error;
pub mod jobs;
pub mod production;
pub mod providers;
pub mod router;
pub mod secrets;
pub mod style;
pub mod studio;
pub mod telemetry;
pub mod types;

pub use config::{load_config, load_config_from_str, Config};
pub use dispatch::{Dispatched, FallbackDispatcher, Route};
pub use error::{
    AdapterError, ApiError, ConfigError, DispatchError, ErrorCode, Result, StudioError,
};
pub use jobs::{JobEvent, JobRecord, JobRegistry, JobStatus, JobStatusView, PollingPolicy};
pub use production::{
    AssetKind, BatchStatus, ProductionBatch, ProductionEstimate, ProductionRequest,
};
pub use providers::{Adapter, ProviderSet, TemplateCatalog, TemplateInfo};
pub use router::{IntentCategory, IntentRouter, RoutingDecision, TextModel};
pub use secrets::{resolve_secret, CredentialError, CredentialSource};
pub use style::{StyleCatalog, StylePreset};
pub use studio::{JobTicket, Studio, StudioBuilder, ToolInfo};
pub use telemetry::{init_logging, LogFormat};
pub use types::{
    AspectRatio, AvatarOptions, EditOptions, GenerationRequest, Modality, ProviderRequest,
    RawStatus, TaskId, ToolChoice, ToolId,
};
