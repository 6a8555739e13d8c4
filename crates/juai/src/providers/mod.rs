//! Provider adapters.
//!
//! Each adapter turns a [`ProviderRequest`] into one external task and reports
//! that task's normalized status. Adapters are stateless apart from their
//! credentials; job bookkeeping lives in [`crate::jobs`].

pub mod creatomate;
pub mod extract;
pub mod goapi;
pub mod heygen;
pub mod http;
pub mod kling;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{AdapterError, ConfigError};
use crate::types::{Modality, ProviderRequest, RawStatus, TaskId, ToolId};

pub use creatomate::{CreatomateAdapter, TemplateInfo};
pub use goapi::{GoApiAdapter, GoApiClient, GoApiModel};
pub use heygen::HeyGenAdapter;
pub use kling::KlingAdapter;

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable adapter name, e.g. `kling` or `goapi:veo`.
    fn name(&self) -> &str;

    fn tool(&self) -> ToolId;

    fn modality(&self) -> Modality {
        self.tool().modality()
    }

    /// Whether credentials are present. Never touches the network.
    fn is_available(&self) -> bool;

    /// Starts one generation task.
    async fn submit(&self, request: &ProviderRequest<'_>) -> Result<TaskId, AdapterError>;

    /// Reads the task's current status.
    async fn poll(&self, task_id: &TaskId) -> Result<RawStatus, AdapterError>;
}

/// Providers that keep reusable render templates.
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<TemplateInfo>, AdapterError>;
}

/// Every adapter the crate can build from configuration.
#[derive(Clone)]
pub struct ProviderSet {
    pub kling: Arc<KlingAdapter>,
    pub heygen: Arc<HeyGenAdapter>,
    pub creatomate: Arc<CreatomateAdapter>,
    goapi: Vec<Arc<GoApiAdapter>>,
}

impl ProviderSet {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let client = http::create_http_client(&config.http)?;
        let providers = &config.providers;

        let goapi_client = Arc::new(GoApiClient::from_config(client.clone(), &providers.goapi)?);
        let goapi = GoApiModel::ALL
            .iter()
            .map(|model| Arc::new(GoApiAdapter::new(Arc::clone(&goapi_client), *model)))
            .collect();

        let set = Self {
            kling: Arc::new(KlingAdapter::from_config(client.clone(), &providers.kling)?),
            heygen: Arc::new(HeyGenAdapter::from_config(client.clone(), &providers.heygen)?),
            creatomate: Arc::new(CreatomateAdapter::from_config(
                client,
                &providers.creatomate,
            )?),
            goapi,
        };

        log::info!(
            "Providers loaded: goapi={}, kling={}, heygen={}, creatomate={}",
            goapi_client.is_configured(),
            set.kling.is_available(),
            set.heygen.is_available(),
            set.creatomate.is_available()
        );

        Ok(set)
    }

    /// The aggregator adapter for `model`.
    pub fn goapi(&self, model: GoApiModel) -> Option<Arc<GoApiAdapter>> {
        self.goapi.iter().find(|a| a.model() == model).cloned()
    }
}
