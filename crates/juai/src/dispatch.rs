//! Per-tool routing to a preferred adapter with at most one fallback.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::error::{AdapterError, DispatchError};
use crate::providers::{Adapter, GoApiModel, ProviderSet};
use crate::types::{Modality, ProviderRequest, TaskId, ToolId};

/// Preferred adapter for a tool plus the single adapter that may stand in
/// for it.
#[derive(Clone)]
pub struct Route {
    pub tool: ToolId,
    pub preferred: Arc<dyn Adapter>,
    pub fallback: Option<Arc<dyn Adapter>>,
    pub fallback_enabled: bool,
}

impl Route {
    pub fn new(tool: ToolId, preferred: Arc<dyn Adapter>) -> Self {
        Self {
            tool,
            preferred,
            fallback: None,
            fallback_enabled: true,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Adapter>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn fallback_enabled(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    fn usable_fallback(&self) -> Option<&Arc<dyn Adapter>> {
        self.fallback
            .as_ref()
            .filter(|_| self.fallback_enabled)
            .filter(|a| a.is_available())
    }

    /// The adapter that accepted `dispatched`, which is the one to poll.
    pub fn adapter_for(&self, dispatched: &Dispatched) -> &Arc<dyn Adapter> {
        self.fallback
            .as_ref()
            .filter(|_| dispatched.fallback_used)
            .unwrap_or(&self.preferred)
    }

    /// Adapter that would serve the next request, if any.
    pub fn active_adapter(&self) -> Option<&Arc<dyn Adapter>> {
        if self.preferred.is_available() {
            Some(&self.preferred)
        } else {
            self.usable_fallback()
        }
    }
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispatched {
    pub task_id: TaskId,
    pub adapter: String,
    pub tool: ToolId,
    pub fallback_used: bool,
    pub primary_error: Option<String>,
}

#[derive(Clone, Default)]
pub struct FallbackDispatcher {
    routes: HashMap<ToolId, Route>,
}

impl FallbackDispatcher {
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Self {
        Self {
            routes: routes.into_iter().map(|r| (r.tool, r)).collect(),
        }
    }

    /// The built-in routing table: official APIs first, aggregator models as
    /// fallbacks, sibling models for image and music.
    pub fn from_providers(providers: &ProviderSet, config: &Config) -> Self {
        let goapi = |model: GoApiModel| -> Option<Arc<dyn Adapter>> {
            providers.goapi(model).map(|a| a as Arc<dyn Adapter>)
        };

        let mut kling = Route::new(ToolId::Kling, providers.kling.clone());
        if let Some(fallback) = goapi(GoApiModel::Kling) {
            kling = kling.with_fallback(fallback);
        }
        let mut routes = vec![
            kling,
            Route::new(ToolId::Heygen, providers.heygen.clone()),
            Route::new(ToolId::Creatomate, providers.creatomate.clone()),
        ];

        let aggregator_routes = [
            (GoApiModel::Veo, Some(GoApiModel::Kling)),
            (GoApiModel::Sora, None),
            (GoApiModel::Hailuo, None),
            (GoApiModel::Luma, None),
            (GoApiModel::Midjourney, Some(GoApiModel::Flux)),
            (GoApiModel::Flux, None),
            (GoApiModel::Suno, Some(GoApiModel::Udio)),
            (GoApiModel::Udio, None),
        ];
        for (model, fallback) in aggregator_routes {
            if let Some(preferred) = goapi(model) {
                let mut route = Route::new(model.tool(), preferred);
                if let Some(fallback) = fallback.and_then(goapi) {
                    route = route.with_fallback(fallback);
                }
                routes.push(route);
            }
        }

        let routes = routes.into_iter().map(|route| {
            let enabled = config.fallback_enabled(route.tool);
            route.fallback_enabled(enabled)
        });
        Self::new(routes)
    }

    pub fn route(&self, tool: ToolId) -> Option<&Route> {
        self.routes.get(&tool)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub async fn dispatch(
        &self,
        tool: ToolId,
        request: &ProviderRequest<'_>,
    ) -> Result<Dispatched, DispatchError> {
        let no_provider = || DispatchError::NoProviderConfigured {
            modality: tool.modality(),
            tool,
        };
        let route = self.routes.get(&tool).ok_or_else(no_provider)?;

        if !route.preferred.is_available() {
            return self.dispatch_without_preferred(route, request).await;
        }

        let primary_error = match route.preferred.submit(request).await {
            Ok(task_id) => {
                tracing::info!(
                    tool = %tool,
                    adapter = route.preferred.name(),
                    task_id = %task_id,
                    "Task submitted"
                );
                return Ok(Dispatched {
                    task_id,
                    adapter: route.preferred.name().to_string(),
                    tool,
                    fallback_used: false,
                    primary_error: None,
                });
            }
            Err(e) => e,
        };

        if !primary_error.allows_fallback() {
            log::warn!("{} failed without fallback: {}", route.preferred.name(), primary_error);
            return Err(DispatchError::Failed(primary_error));
        }

        if route.fallback.is_none() {
            return Err(DispatchError::Failed(primary_error));
        }
        if !route.fallback_enabled {
            return Err(DispatchError::FallbackDisabled {
                tool,
                source: primary_error,
            });
        }

        let Some(fallback) = route.usable_fallback() else {
            return Err(DispatchError::Failed(primary_error));
        };

        log::warn!(
            "{} failed ({}), retrying once on {}",
            route.preferred.name(),
            primary_error,
            fallback.name()
        );
        submit_fallback(tool, fallback.as_ref(), request, primary_error).await
    }

    async fn dispatch_without_preferred(
        &self,
        route: &Route,
        request: &ProviderRequest<'_>,
    ) -> Result<Dispatched, DispatchError> {
        let tool = route.tool;
        let primary_error = AdapterError::missing_credentials(route.preferred.name());

        if route.fallback.is_none() {
            return Err(DispatchError::NoProviderConfigured {
                modality: tool.modality(),
                tool,
            });
        }
        if !route.fallback_enabled {
            return Err(DispatchError::FallbackDisabled {
                tool,
                source: primary_error,
            });
        }

        match route.usable_fallback() {
            Some(fallback) => {
                log::info!(
                    "{} is not configured, using {}",
                    route.preferred.name(),
                    fallback.name()
                );
                submit_fallback(tool, fallback.as_ref(), request, primary_error).await
            }
            None => Err(DispatchError::NoProviderConfigured {
                modality: tool.modality(),
                tool,
            }),
        }
    }

    /// Modalities with at least one usable adapter.
    pub fn available_modalities(&self) -> Vec<Modality> {
        let mut modalities: Vec<Modality> = self
            .routes
            .values()
            .filter(|r| r.active_adapter().is_some())
            .map(|r| r.tool.modality())
            .collect();
        modalities.sort();
        modalities.dedup();
        modalities
    }
}

async fn submit_fallback(
    tool: ToolId,
    fallback: &dyn Adapter,
    request: &ProviderRequest<'_>,
    primary_error: AdapterError,
) -> Result<Dispatched, DispatchError> {
    match fallback.submit(request).await {
        Ok(task_id) => {
            tracing::info!(
                tool = %tool,
                adapter = fallback.name(),
                task_id = %task_id,
                fallback = true,
                "Task submitted"
            );
            Ok(Dispatched {
                task_id,
                adapter: fallback.name().to_string(),
                tool,
                fallback_used: true,
                primary_error: Some(primary_error.to_string()),
            })
        }
        Err(fallback_error) => Err(DispatchError::Exhausted {
            tool,
            primary: primary_error,
            fallback: fallback_error,
        }),
    }
}
