//! HeyGen talking-avatar videos.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::config::ApiKeyProvider;
use crate::error::{AdapterError, ConfigError};
use crate::providers::extract::{first_string, normalize_state};
use crate::providers::http::{send_json, CallKind};
use crate::providers::Adapter;
use crate::types::{ProviderRequest, ProviderState, RawStatus, TaskId, ToolId};

pub const DEFAULT_BASE_URL: &str = "https://api.heygen.com";

const NAME: &str = "heygen";
const DEFAULT_AVATAR_ID: &str = "default";
const DEFAULT_VOICE_ID: &str = "korean_female_1";

pub struct HeyGenAdapter {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HeyGenAdapter {
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

/// The avatar reads the prompt verbatim, so no style suffix is appended.
fn payload(request: &ProviderRequest<'_>) -> Value {
    let avatar = request.request.avatar.clone().unwrap_or_default();
    let (width, height) = request.request.aspect_ratio.dimensions();

    json!({
        "video_inputs": [{
            "character": {
                "type": "avatar",
                "avatar_id": avatar.avatar_id.as_deref().unwrap_or(DEFAULT_AVATAR_ID),
            },
            "voice": {
                "type": "text",
                "input_text": request.prompt,
                "voice_id": avatar.voice_id.as_deref().unwrap_or(DEFAULT_VOICE_ID),
            },
        }],
        "dimension": {"width": width, "height": height},
    })
}

#[async_trait]
impl Adapter for HeyGenAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn tool(&self) -> ToolId {
        ToolId::Heygen
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn submit(&self, request: &ProviderRequest<'_>) -> Result<TaskId, AdapterError> {
        let key = self.key()?;
        let url = format!("{}/v2/video/generate", self.base_url);

        let body = send_json(
            NAME,
            self.http
                .post(&url)
                .header("X-Api-Key", key)
                .json(&payload(request)),
            CallKind::Submit,
        )
        .await?;

        if let Some(message) = first_string(&body, &["/error/message"]) {
            return Err(AdapterError::Rejected {
                provider: NAME.to_string(),
                status: 400,
                message,
            });
        }

        first_string(&body, &["/data/video_id"])
            .map(TaskId::new)
            .ok_or_else(|| AdapterError::Protocol {
                provider: NAME.to_string(),
                message: "response has no data.video_id".to_string(),
            })
    }

    async fn poll(&self, task_id: &TaskId) -> Result<RawStatus, AdapterError> {
        let key = self.key()?;
        let url = format!("{}/v1/video_status.get", self.base_url);

        let body = send_json(
            NAME,
            self.http
                .get(&url)
                .query(&[("video_id", task_id.as_str())])
                .header("X-Api-Key", key),
            CallKind::Poll,
        )
        .await?;

        let state = first_string(&body, &["/data/status"])
            .map(|s| normalize_state(&s))
            .unwrap_or(ProviderState::Unknown);

        Ok(RawStatus {
            state,
            progress: None,
            result_url: first_string(&body, &["/data/video_url"]),
            error: first_string(&body, &["/data/error/message", "/data/error/detail"]),
        })
    }
}
