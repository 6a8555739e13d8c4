//! GoAPI aggregator: one HTTP API fronting many video, image and music models.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};

use crate::config::ApiKeyProvider;
use crate::error::{AdapterError, ConfigError};
use crate::providers::extract::{first_progress, first_string, normalize_state};
use crate::providers::http::{classify_status, send_json, CallKind};
use crate::providers::Adapter;
use crate::types::{ProviderRequest, ProviderState, RawStatus, TaskId, ToolId};

pub const DEFAULT_BASE_URL: &str = "https://api.goapi.ai";

const MIDJOURNEY_PARAMS: &str = "--v 6.1 --stylize 750";

const VIDEO_RULES: &[&str] = &["/data/output/video_url", "/data/output/video/url"];
const KLING_RULES: &[&str] = &[
    "/data/output/video_url",
    "/data/output/works/*/video/resource_without_watermark",
    "/data/output/works/*/video/resource",
];
const MIDJOURNEY_RULES: &[&str] = &[
    "/data/output/image_url",
    "/data/output/image_urls/*",
    "/data/output/temporary_image_urls/*",
];
const FLUX_RULES: &[&str] = &["/data/output/image_url", "/data/output/image_urls/*"];
const MUSIC_RULES: &[&str] = &[
    "/data/output/clips/*/audio_url",
    "/data/output/audio_url",
    "/data/output/songs/*/song_path",
];
const PROGRESS_RULES: &[&str] = &["/data/output/progress", "/data/progress"];

/// How a model treats `source_image_url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageInput {
    Optional,
    Required,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoApiModel {
    Kling,
    Veo,
    Sora,
    Hailuo,
    Luma,
    Midjourney,
    Flux,
    Suno,
    Udio,
}

impl GoApiModel {
    pub const ALL: [GoApiModel; 9] = [
        GoApiModel::Kling,
        GoApiModel::Veo,
        GoApiModel::Sora,
        GoApiModel::Hailuo,
        GoApiModel::Luma,
        GoApiModel::Midjourney,
        GoApiModel::Flux,
        GoApiModel::Suno,
        GoApiModel::Udio,
    ];

    pub fn tool(&self) -> ToolId {
        match self {
            GoApiModel::Kling => ToolId::Kling,
            GoApiModel::Veo => ToolId::Veo,
            GoApiModel::Sora => ToolId::Sora,
            GoApiModel::Hailuo => ToolId::Hailuo,
            GoApiModel::Luma => ToolId::Luma,
            GoApiModel::Midjourney => ToolId::Midjourney,
            GoApiModel::Flux => ToolId::Flux,
            GoApiModel::Suno => ToolId::Suno,
            GoApiModel::Udio => ToolId::Udio,
        }
    }

    /// `model` field of the task payload.
    pub fn model_name(&self) -> &'static str {
        match self {
            GoApiModel::Kling => "kling",
            GoApiModel::Veo => "veo3",
            GoApiModel::Sora => "sora",
            GoApiModel::Hailuo => "hailuo",
            GoApiModel::Luma => "luma",
            GoApiModel::Midjourney => "midjourney",
            GoApiModel::Flux => "Qubico/flux1-schnell",
            GoApiModel::Suno => "music-s",
            GoApiModel::Udio => "music-u",
        }
    }

    fn task_type(&self, has_image: bool) -> &'static str {
        match self {
            GoApiModel::Kling | GoApiModel::Hailuo | GoApiModel::Luma => "video_generation",
            GoApiModel::Veo => "img2video",
            GoApiModel::Sora => "txt2video",
            GoApiModel::Midjourney => "imagine",
            GoApiModel::Flux if has_image => "img2img",
            GoApiModel::Flux => "txt2img",
            GoApiModel::Suno | GoApiModel::Udio => "generate_music",
        }
    }

    fn image_input(&self) -> ImageInput {
        match self {
            GoApiModel::Kling | GoApiModel::Hailuo | GoApiModel::Luma | GoApiModel::Flux => {
                ImageInput::Optional
            }
            GoApiModel::Veo => ImageInput::Required,
            GoApiModel::Sora
            | GoApiModel::Midjourney
            | GoApiModel::Suno
            | GoApiModel::Udio => ImageInput::Unsupported,
        }
    }

    fn result_rules(&self) -> &'static [&'static str] {
        match self {
            GoApiModel::Kling => KLING_RULES,
            GoApiModel::Veo | GoApiModel::Sora | GoApiModel::Hailuo | GoApiModel::Luma => {
                VIDEO_RULES
            }
            GoApiModel::Midjourney => MIDJOURNEY_RULES,
            GoApiModel::Flux => FLUX_RULES,
            GoApiModel::Suno | GoApiModel::Udio => MUSIC_RULES,
        }
    }

    /// Model-specific `input` object.
    fn input(&self, request: &ProviderRequest<'_>, image: Option<&str>) -> Value {
        let prompt = request.enhanced_prompt();
        let aspect_ratio = request.request.aspect_ratio.as_str();
        let mut input = match self {
            GoApiModel::Kling => json!({
                "prompt": prompt,
                "duration": request.duration_or(5),
                "aspect_ratio": aspect_ratio,
                "mode": "std",
                "version": "1.6",
            }),
            GoApiModel::Veo => json!({
                "prompt": prompt,
                "aspect_ratio": aspect_ratio,
                "duration": request.duration_or(8),
            }),
            GoApiModel::Sora => json!({
                "prompt": prompt,
                "aspect_ratio": aspect_ratio,
                "duration": request.duration_or(10),
            }),
            GoApiModel::Hailuo => json!({
                "prompt": prompt,
                "model": if image.is_some() { "i2v-01" } else { "t2v-01" },
                "expand_prompt": true,
            }),
            GoApiModel::Luma => json!({
                "prompt": prompt,
                "model_name": "ray-v2",
                "duration": "5s",
                "aspect_ratio": aspect_ratio,
            }),
            GoApiModel::Midjourney => json!({
                "prompt": midjourney_prompt(&prompt, aspect_ratio),
                "aspect_ratio": aspect_ratio,
                "process_mode": "fast",
            }),
            GoApiModel::Flux => {
                let (width, height) = request.request.aspect_ratio.dimensions();
                json!({
                    "prompt": prompt,
                    "width": width / 2,
                    "height": height / 2,
                })
            }
            GoApiModel::Suno | GoApiModel::Udio => json!({
                "gpt_description_prompt": prompt,
                "make_instrumental": true,
            }),
        };

        if let Value::Object(map) = &mut input {
            if let Some(negative) = request.request.negative_prompt.as_deref() {
                if self.tool().modality() != crate::types::Modality::Music {
                    map.insert("negative_prompt".to_string(), json!(negative));
                }
            }
            if let Some(url) = image {
                insert_image(*self, map, url);
            }
        }
        input
    }
}

fn insert_image(model: GoApiModel, map: &mut Map<String, Value>, url: &str) {
    match model {
        GoApiModel::Luma => {
            map.insert(
                "key_frames".to_string(),
                json!({"frame0": {"type": "image", "url": url}}),
            );
        }
        GoApiModel::Flux => {
            map.insert("image".to_string(), json!(url));
        }
        _ => {
            map.insert("image_url".to_string(), json!(url));
        }
    }
}

/// Connection shared by every GoAPI model adapter.
pub struct GoApiClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl GoApiClient {
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
                provider: "goapi".to_string(),
                source,
            })?;
        let client = Self::new(http, api_key);
        Ok(match &config.base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self, provider: &str) -> Result<&str, AdapterError> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .ok_or_else(|| AdapterError::missing_credentials(provider))
    }
}

pub struct GoApiAdapter {
    client: Arc<GoApiClient>,
    model: GoApiModel,
    name: String,
}

impl GoApiAdapter {
    pub fn new(client: Arc<GoApiClient>, model: GoApiModel) -> Self {
        Self {
            client,
            model,
            name: format!("goapi:{}", model.tool()),
        }
    }

    pub fn model(&self) -> GoApiModel {
        self.model
    }

    /// GoAPI wraps errors in a 200 response with its own `code` field.
    fn check_body_code(&self, body: &Value, kind: CallKind) -> Result<(), AdapterError> {
        match body.get("code").and_then(Value::as_u64) {
            Some(200) | None => Ok(()),
            Some(code) => {
                let message = crate::providers::http::error_message(body).unwrap_or_default();
                let status = u16::try_from(code).unwrap_or(400);
                Err(classify_status(&self.name, status, &message, kind))
            }
        }
    }

    fn image_for<'a>(&self, request: &'a ProviderRequest<'_>) -> Result<Option<&'a str>, AdapterError> {
        let image = request
            .request
            .source_image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty());

        match (self.model.image_input(), image) {
            (ImageInput::Required, None) => Err(AdapterError::Validation {
                provider: self.name.clone(),
                message: format!("{} requires a source image", self.model.tool()),
            }),
            (ImageInput::Unsupported, Some(_)) => {
                log::warn!(
                    "{} is text-to-video only; ignoring source image",
                    self.name
                );
                Ok(None)
            }
            (_, image) => Ok(image),
        }
    }
}

#[async_trait]
impl Adapter for GoApiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn tool(&self) -> ToolId {
        self.model.tool()
    }

    fn is_available(&self) -> bool {
        self.client.is_configured()
    }

    async fn submit(&self, request: &ProviderRequest<'_>) -> Result<TaskId, AdapterError> {
        let key = self.client.key(&self.name)?;
        let image = self.image_for(request)?;

        let payload = json!({
            "model": self.model.model_name(),
            "task_type": self.model.task_type(image.is_some()),
            "input": self.model.input(request, image),
        });

        let url = format!("{}/api/v1/task", self.client.base_url);
        log::debug!("Submitting {} task to {}", self.name, url);

        let body = send_json(
            &self.name,
            self.client
                .http
                .post(&url)
                .header("x-api-key", key)
                .json(&payload),
            CallKind::Submit,
        )
        .await?;
        self.check_body_code(&body, CallKind::Submit)?;

        first_string(&body, &["/data/task_id", "/task_id"])
            .map(TaskId::new)
            .ok_or_else(|| AdapterError::Protocol {
                provider: self.name.clone(),
                message: "response has no task_id".to_string(),
            })
    }

    async fn poll(&self, task_id: &TaskId) -> Result<RawStatus, AdapterError> {
        let key = self.client.key(&self.name)?;
        let url = format!("{}/api/v1/task/{}", self.client.base_url, task_id);

        let body = send_json(
            &self.name,
            self.client.http.get(&url).header("x-api-key", key),
            CallKind::Poll,
        )
        .await?;
        self.check_body_code(&body, CallKind::Poll)?;

        let state = first_string(&body, &["/data/status"])
            .map(|s| normalize_state(&s))
            .unwrap_or(ProviderState::Unknown);

        Ok(RawStatus {
            state,
            progress: first_progress(&body, PROGRESS_RULES),
            result_url: first_string(&body, self.model.result_rules()),
            error: first_string(&body, &["/data/error/message", "/data/error/raw_message"]),
        })
    }
}

/// Midjourney parameters must trail all descriptive text.
fn midjourney_prompt(prompt: &str, aspect_ratio: &str) -> String {
    format!(
        "{} --ar {} {}",
        prompt.trim_end_matches([' ', ',']),
        aspect_ratio,
        MIDJOURNEY_PARAMS
    )
}
