//! The orchestration facade.
//!
//! [`Studio`] validates a request, resolves its style and tool, dispatches it
//! to a provider, and hands the accepted task to the job tracker. Submission
//! returns as soon as the provider accepts the task; progress is read back
//! with [`Studio::check_status`] or streamed through [`Studio::subscribe`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::{validate_config, Config};
use crate::dispatch::FallbackDispatcher;
use crate::error::{ConfigError, DispatchError, Result, StudioError};
use crate::jobs::{
    InMemoryJobRegistry, JobEvent, JobEventBroadcaster, JobRecord, JobRegistry, JobStatus,
    JobStatusView, JobTracker, PollingPolicy,
};
use crate::production::{
    self, AssetError, AssetKind, AssetTicket, ProductionBatch, ProductionEstimate,
    ProductionRequest,
};
use crate::providers::creatomate::MIN_COMPOSITION_SOURCES;
use crate::providers::http::create_http_client;
use crate::providers::{ProviderSet, TemplateCatalog, TemplateInfo};
use crate::router::gemini::GeminiModel;
use crate::router::model::TextModel;
use crate::router::{templates, IntentRouter, RoutingDecision};
use crate::style::{StyleCatalog, StylePreset};
use crate::types::{GenerationRequest, Modality, ProviderRequest, ToolChoice, ToolId};

const MAX_DURATION_SECS: u32 = 60;

/// Returned as soon as a provider has accepted the task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTicket {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub tool: ToolId,
    pub provider: String,
    pub fallback_used: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingDecision>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub id: ToolId,
    pub modality: Modality,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_adapter: Option<String>,
}

pub struct Studio {
    styles: StyleCatalog,
    router: IntentRouter,
    dispatcher: FallbackDispatcher,
    tracker: JobTracker,
    templates: Option<Arc<dyn TemplateCatalog>>,
}

impl Studio {
    pub fn builder() -> StudioBuilder {
        StudioBuilder::default()
    }

    /// Wires every component from configuration. Providers without
    /// credentials are built anyway and report themselves unavailable.
    /// Configs built in code are validated the same way as loaded ones.
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        validate_config(config)?;
        let providers = ProviderSet::from_config(config)?;
        let dispatcher = FallbackDispatcher::from_providers(&providers, config);

        let http = create_http_client(&config.http)?;
        let model = GeminiModel::from_config(http, &config.providers.gemini)?
            .map(|m| Arc::new(m) as Arc<dyn TextModel>);

        Ok(Self::builder()
            .with_styles(StyleCatalog::with_default(&config.styles.default))
            .with_router(IntentRouter::new(model))
            .with_dispatcher(dispatcher)
            .with_policy(PollingPolicy::from_config(&config.polling))
            .with_templates(Arc::clone(&providers.creatomate) as Arc<dyn TemplateCatalog>)
            .build())
    }

    /// Validates, routes and dispatches `request`, then starts tracking the
    /// accepted task in the background.
    pub async fn submit_generation(&self, request: GenerationRequest) -> Result<JobTicket> {
        validate(&request)?;

        let style = self.styles.resolve(request.style_preset.as_deref());
        let (tool, prompt, routing) = self.select_tool(&request).await;

        let provider_request = ProviderRequest::new(&request, &prompt, style);
        let dispatched = self.dispatcher.dispatch(tool, &provider_request).await?;

        let adapter = match self.dispatcher.route(tool) {
            Some(route) => Arc::clone(route.adapter_for(&dispatched)),
            None => {
                return Err(StudioError::Dispatch(DispatchError::NoProviderConfigured {
                    modality: tool.modality(),
                    tool,
                }))
            }
        };

        let record = JobRecord::new(&dispatched, request.modality);
        tracing::info!(
            job_id = %record.job_id,
            tool = %tool,
            adapter = %dispatched.adapter,
            style = style.id,
            fallback = dispatched.fallback_used,
            "Job accepted"
        );

        let ticket = JobTicket {
            job_id: record.job_id.clone(),
            status: record.status,
            progress: record.progress,
            tool,
            provider: record.provider.clone(),
            fallback_used: record.fallback_used,
            message: record.message.clone(),
            routing,
        };
        // Detached: the poller ends on its own at a terminal state or budget exhaustion
        let _ = self.tracker.track(record, adapter);
        Ok(ticket)
    }

    pub async fn generate_video(&self, request: GenerationRequest) -> Result<JobTicket> {
        self.submit_as(Modality::Video, request).await
    }

    pub async fn generate_image(&self, request: GenerationRequest) -> Result<JobTicket> {
        self.submit_as(Modality::Image, request).await
    }

    pub async fn generate_music(&self, request: GenerationRequest) -> Result<JobTicket> {
        self.submit_as(Modality::Music, request).await
    }

    pub async fn generate_avatar(&self, request: GenerationRequest) -> Result<JobTicket> {
        self.submit_as(Modality::Avatar, request).await
    }

    pub async fn edit_video(&self, request: GenerationRequest) -> Result<JobTicket> {
        self.submit_as(Modality::Edit, request).await
    }

    async fn submit_as(&self, modality: Modality, request: GenerationRequest) -> Result<JobTicket> {
        if request.modality != modality {
            return Err(StudioError::Validation(format!(
                "expected a {} request, got {}",
                modality, request.modality
            )));
        }
        self.submit_generation(request).await
    }

    /// Submits the thumbnail and the clip of a production concurrently. A
    /// submission that fails is reported in the batch; the other asset is
    /// still tracked.
    pub async fn produce(&self, request: ProductionRequest) -> Result<ProductionBatch> {
        if request.concept.trim().is_empty() {
            return Err(StudioError::Validation(
                "concept must not be empty".to_string(),
            ));
        }

        let estimate = self.estimate_production_time(&request);
        let (thumbnail, clip) = tokio::join!(
            self.submit_generation(request.thumbnail_request()),
            self.submit_generation(request.clip_request()),
        );

        let mut assets = Vec::new();
        let mut errors = Vec::new();
        for (kind, outcome) in [(AssetKind::Thumbnail, thumbnail), (AssetKind::Clip, clip)] {
            match outcome {
                Ok(ticket) => assets.push(AssetTicket { kind, ticket }),
                Err(e) => {
                    log::warn!("Production {:?} asset was not accepted: {}", kind, e);
                    errors.push(AssetError {
                        kind,
                        error: e.to_api_error(),
                    });
                }
            }
        }

        let batch = ProductionBatch::new(assets, errors, estimate);
        tracing::info!(
            status = ?batch.status,
            accepted = batch.assets.len(),
            failed = batch.errors.len(),
            "Production submitted"
        );
        Ok(batch)
    }

    pub fn estimate_production_time(&self, request: &ProductionRequest) -> ProductionEstimate {
        let style = self.styles.resolve(request.style_preset.as_deref());
        production::estimate(request, style)
    }

    /// Render templates available to edit requests.
    pub async fn list_templates(&self) -> Result<Vec<TemplateInfo>> {
        let catalog = self.templates.as_ref().ok_or(StudioError::Dispatch(
            DispatchError::NoProviderConfigured {
                modality: Modality::Edit,
                tool: ToolId::Creatomate,
            },
        ))?;
        Ok(catalog.list_templates().await?)
    }

    pub fn check_status(&self, job_id: &str) -> Result<JobStatusView> {
        self.tracker
            .get(job_id)
            .map(|record| record.view())
            .ok_or_else(|| StudioError::JobNotFound(job_id.to_string()))
    }

    /// Jobs still pending or processing, oldest first.
    pub fn active_jobs(&self) -> Vec<JobStatusView> {
        self.tracker
            .registry()
            .list_active()
            .iter()
            .map(JobRecord::view)
            .collect()
    }

    /// Every tool with the adapter that would currently serve it.
    pub fn list_available_tools(&self) -> Vec<ToolInfo> {
        ToolId::ALL
            .iter()
            .map(|&tool| {
                let active = self
                    .dispatcher
                    .route(tool)
                    .and_then(|route| route.active_adapter());
                ToolInfo {
                    id: tool,
                    modality: tool.modality(),
                    available: active.is_some(),
                    source_adapter: active.map(|adapter| adapter.name().to_string()),
                }
            })
            .collect()
    }

    pub fn available_modalities(&self) -> Vec<Modality> {
        self.dispatcher.available_modalities()
    }

    pub fn list_style_presets(&self) -> &'static [StylePreset] {
        self.styles.list()
    }

    pub async fn classify(&self, text: &str, context: Option<&str>) -> RoutingDecision {
        self.router.classify(text, context).await
    }

    pub async fn draft_avatar_script(&self, topic: &str, style: &str) -> String {
        self.router.avatar_script(topic, style).await
    }

    pub async fn suggest_music_prompt(&self, description: &str, mood: &str) -> String {
        self.router.music_prompt(description, mood).await
    }

    pub async fn optimize_prompt(&self, prompt: &str, tool: ToolId) -> String {
        self.router.optimize_prompt(prompt, tool).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tracker.events().subscribe()
    }

    /// Explicit tools pass through with the caller's prompt. `auto` asks the
    /// router for video, image and music; avatar and edit have one tool each
    /// and keep their text verbatim.
    async fn select_tool(
        &self,
        request: &GenerationRequest,
    ) -> (ToolId, String, Option<RoutingDecision>) {
        let modality = request.modality;
        if let ToolChoice::Tool(tool) = request.tool {
            return (tool, request.prompt.clone(), None);
        }
        if matches!(modality, Modality::Avatar | Modality::Edit) {
            return (modality.default_tool(), request.prompt.clone(), None);
        }

        let decision = self.router.classify(&request.prompt, None).await;
        let chosen = decision.candidates().find(|t| t.modality() == modality);
        let (tool, prompt) = match chosen {
            Some(tool) => {
                let prompt = decision
                    .prompt_for(tool)
                    .map(str::to_string)
                    .unwrap_or_else(|| templates::optimized_prompt(tool, &request.prompt));
                (tool, prompt)
            }
            None => {
                let tool = modality.default_tool();
                (tool, templates::optimized_prompt(tool, &request.prompt))
            }
        };
        log::debug!(
            "Auto-selected {} for {} request (intent {})",
            tool,
            modality,
            decision.intent
        );
        (tool, prompt, Some(decision))
    }
}

/// Rejects malformed requests before any network call.
fn validate(request: &GenerationRequest) -> Result<()> {
    let invalid = |msg: String| Err(StudioError::Validation(msg));

    let has_template = request
        .edit
        .as_ref()
        .and_then(|e| e.template_id.as_deref())
        .is_some_and(|t| !t.trim().is_empty());

    if request.prompt.trim().is_empty() && !(request.modality == Modality::Edit && has_template) {
        return invalid("prompt must not be empty".to_string());
    }

    if let ToolChoice::Tool(tool) = request.tool {
        if tool.modality() != request.modality {
            return invalid(format!(
                "{} generates {}, not {}",
                tool,
                tool.modality(),
                request.modality
            ));
        }
    }

    if let Some(secs) = request.duration_secs {
        if secs == 0 || secs > MAX_DURATION_SECS {
            return invalid(format!(
                "duration must be between 1 and {}s, got {}s",
                MAX_DURATION_SECS, secs
            ));
        }
    }

    if request.modality == Modality::Edit && !has_template {
        let sources = request
            .edit
            .as_ref()
            .map(|e| e.sources.iter().filter(|s| !s.trim().is_empty()).count())
            .unwrap_or(0);
        if sources < MIN_COMPOSITION_SOURCES {
            return invalid(format!(
                "an edit needs a template or at least {} sources, got {}",
                MIN_COMPOSITION_SOURCES, sources
            ));
        }
    }

    Ok(())
}

/// Assembles a [`Studio`] from injected parts. Anything not supplied gets a
/// working default: keyword-only routing, an empty dispatcher, an in-memory
/// registry and the default polling policy. Without a template catalog,
/// template listing reports the provider as unconfigured.
#[derive(Default)]
pub struct StudioBuilder {
    styles: Option<StyleCatalog>,
    router: Option<IntentRouter>,
    dispatcher: Option<FallbackDispatcher>,
    registry: Option<Arc<dyn JobRegistry>>,
    events: Option<JobEventBroadcaster>,
    policy: Option<PollingPolicy>,
    templates: Option<Arc<dyn TemplateCatalog>>,
}

impl StudioBuilder {
    pub fn with_styles(mut self, styles: StyleCatalog) -> Self {
        self.styles = Some(styles);
        self
    }

    pub fn with_router(mut self, router: IntentRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: FallbackDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn JobRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_events(mut self, events: JobEventBroadcaster) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_policy(mut self, policy: PollingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateCatalog>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn build(self) -> Studio {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(InMemoryJobRegistry::new()));
        let tracker = JobTracker::new(
            registry,
            self.events.unwrap_or_default(),
            self.policy.unwrap_or_default(),
        );
        Studio {
            styles: self.styles.unwrap_or_default(),
            router: self.router.unwrap_or_default(),
            dispatcher: self.dispatcher.unwrap_or_default(),
            tracker,
            templates: self.templates,
        }
    }
}
