//! Creatomate template rendering and clip composition.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::ApiKeyProvider;
use crate::error::{AdapterError, ConfigError};
use crate::providers::extract::{first_string, normalize_state};
use crate::providers::http::{send_json, CallKind};
use crate::providers::{Adapter, TemplateCatalog};
use crate::types::{EditOptions, ProviderRequest, ProviderState, RawStatus, TaskId, ToolId};

pub const DEFAULT_BASE_URL: &str = "https://api.creatomate.com";

const NAME: &str = "creatomate";
pub const MIN_COMPOSITION_SOURCES: usize = 2;

/// A template stored in the Creatomate project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub struct CreatomateAdapter {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl CreatomateAdapter {
    pub fn new(http: Client, api_key: Option<SecretString>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
        }
    }

    pub fn from_config(http: Client, config: &ApiKeyProvider) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .resolve()
            .map_err(|source| ConfigError::Credential {
                provider: NAME.to_string(),
                source,
            })?;
        let adapter = Self::new(http, api_key);
        Ok(match &config.base_url {
            Some(url) => adapter.with_base_url(url),
            None => adapter,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn key(&self) -> Result<&str, AdapterError> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .ok_or_else(|| AdapterError::missing_credentials(NAME))
    }
}

/// Template render when a template id is given, otherwise a sequential
/// composition of the source clips.
fn payload(request: &ProviderRequest<'_>) -> Result<Value, AdapterError> {
    let edit = request.request.edit.clone().unwrap_or_default();

    if let Some(template_id) = edit.template_id.as_deref().filter(|t| !t.is_empty()) {
        return Ok(json!({
            "template_id": template_id,
            "modifications": modifications(request, &edit),
            "output_format": "mp4",
        }));
    }

    if edit.sources.len() < MIN_COMPOSITION_SOURCES {
        return Err(AdapterError::Validation {
            provider: NAME.to_string(),
            message: format!(
                "composition needs a template id or at least {} source clips",
                MIN_COMPOSITION_SOURCES
            ),
        });
    }

    let (width, height) = request.request.aspect_ratio.dimensions();
    let elements: Vec<Value> = edit
        .sources
        .iter()
        .map(|url| json!({"type": "video", "track": 1, "source": url}))
        .collect();

    Ok(json!({
        "source": {
            "output_format": "mp4",
            "width": width,
            "height": height,
            "elements": elements,
        }
    }))
}

fn modifications(request: &ProviderRequest<'_>, edit: &EditOptions) -> Map<String, Value> {
    let mut map: Map<String, Value> = edit
        .modifications
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if !request.prompt.trim().is_empty() {
        map.entry("headline")
            .or_insert_with(|| json!(request.prompt.trim()));
    }
    map.entry("filter").or_insert_with(|| json!(request.style.id));
    if let Some(first) = edit.sources.first() {
        map.entry("background_video")
            .or_insert_with(|| json!(first));
    }
    map
}

#[async_trait]
impl Adapter for CreatomateAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn tool(&self) -> ToolId {
        ToolId::Creatomate
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn submit(&self, request: &ProviderRequest<'_>) -> Result<TaskId, AdapterError> {
        let body = payload(request)?;
        let key = self.key()?;
        let url = format!("{}/v1/renders", self.base_url);

        let response = send_json(
            NAME,
            self.http.post(&url).bearer_auth(key).json(&body),
            CallKind::Submit,
        )
        .await?;

        // One render per output; the API answers with an array.
        first_string(&response, &["/id", "/*/id"])
            .map(TaskId::new)
            .ok_or_else(|| AdapterError::Protocol {
                provider: NAME.to_string(),
                message: "response has no render id".to_string(),
            })
    }

    async fn poll(&self, task_id: &TaskId) -> Result<RawStatus, AdapterError> {
        let key = self.key()?;
        let url = format!("{}/v1/renders/{}", self.base_url, task_id);

        let body = send_json(NAME, self.http.get(&url).bearer_auth(key), CallKind::Poll).await?;

        let state = first_string(&body, &["/status"])
            .map(|s| normalize_state(&s))
            .unwrap_or(ProviderState::Unknown);

        Ok(RawStatus {
            state,
            progress: None,
            result_url: first_string(&body, &["/url"]),
            error: first_string(&body, &["/error_message"]),
        })
    }
}

#[async_trait]
impl TemplateCatalog for CreatomateAdapter {
    async fn list_templates(&self) -> Result<Vec<TemplateInfo>, AdapterError> {
        let key = self.key()?;
        let url = format!("{}/v1/templates", self.base_url);

        let body = send_json(NAME, self.http.get(&url).bearer_auth(key), CallKind::Poll).await?;

        let templates: Vec<TemplateInfo> =
            serde_json::from_value(body).map_err(|e| AdapterError::Protocol {
                provider: NAME.to_string(),
                message: format!("unexpected template list: {}", e),
            })?;
        log::debug!("Creatomate returned {} templates", templates.len());
        Ok(templates)
    }
}
