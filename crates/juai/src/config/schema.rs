use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::secrets::CredentialSource;
use crate::style::DEFAULT_STYLE_ID;
use crate::types::{Modality, ToolId};

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub tools: BTreeMap<ToolId, ToolSettings>,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub styles: StylesConfig,
}

impl Default for Config {
    /// Config that reads every credential from its conventional env var.
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            providers: ProvidersConfig::default(),
            tools: BTreeMap::new(),
            polling: PollingConfig::default(),
            http: HttpConfig::default(),
            styles: StylesConfig::default(),
        }
    }
}

impl Config {
    /// Per-tool fallback flag; tools without an entry fall back.
    pub fn fallback_enabled(&self, tool: ToolId) -> bool {
        self.tools.get(&tool).map(|t| t.fallback).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersConfig {
    #[serde(default = "default_goapi")]
    pub goapi: ApiKeyProvider,
    #[serde(default)]
    pub kling: KlingProvider,
    #[serde(default = "default_heygen")]
    pub heygen: ApiKeyProvider,
    #[serde(default = "default_creatomate")]
    pub creatomate: ApiKeyProvider,
    #[serde(default)]
    pub gemini: GeminiProvider,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            goapi: default_goapi(),
            kling: KlingProvider::default(),
            heygen: default_heygen(),
            creatomate: default_creatomate(),
            gemini: GeminiProvider::default(),
        }
    }
}

fn default_goapi() -> ApiKeyProvider {
    ApiKeyProvider::from_env("GOAPI_KEY")
}

fn default_heygen() -> ApiKeyProvider {
    ApiKeyProvider::from_env("HEYGEN_API_KEY")
}

fn default_creatomate() -> ApiKeyProvider {
    ApiKeyProvider::from_env("CREATOMATE_API_KEY")
}

/// A provider authenticated with a single API key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyProvider {
    #[serde(default)]
    pub api_key: CredentialSource,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ApiKeyProvider {
    pub fn from_env(var: &str) -> Self {
        Self {
            api_key: CredentialSource::from_env(var),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlingProvider {
    #[serde(default)]
    pub access_key: CredentialSource,
    #[serde(default)]
    pub secret_key: CredentialSource,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_kling_model")]
    pub model: String,
}

fn default_kling_model() -> String {
    "kling-v1-6".to_string()
}

impl Default for KlingProvider {
    fn default() -> Self {
        Self {
            access_key: CredentialSource::from_env("KLING_ACCESS_KEY"),
            secret_key: CredentialSource::from_env("KLING_SECRET_KEY"),
            base_url: None,
            model: default_kling_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiProvider {
    #[serde(default)]
    pub api_key: CredentialSource,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}

fn default_gemini_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_gemini_timeout() -> u64 {
    15
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self {
            api_key: CredentialSource::from_env("GOOGLE_GEMINI_API_KEY"),
            base_url: None,
            model: default_gemini_model(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSettings {
    #[serde(default = "default_true")]
    pub fallback: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self { fallback: true }
    }
}

/// Poll interval and per-modality wall-clock budgets, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub budgets: BudgetConfig,
}

fn default_interval() -> u64 {
    3
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            budgets: BudgetConfig::default(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn budget(&self, modality: Modality) -> Duration {
        Duration::from_secs(self.budgets.secs(modality))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetConfig {
    #[serde(default = "default_video_budget")]
    pub video: u64,
    #[serde(default = "default_avatar_budget")]
    pub avatar: u64,
    #[serde(default = "default_edit_budget")]
    pub edit: u64,
    #[serde(default = "default_music_budget")]
    pub music: u64,
    #[serde(default = "default_image_budget")]
    pub image: u64,
}

fn default_video_budget() -> u64 {
    600
}

fn default_avatar_budget() -> u64 {
    900
}

fn default_edit_budget() -> u64 {
    600
}

fn default_music_budget() -> u64 {
    300
}

fn default_image_budget() -> u64 {
    180
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            video: default_video_budget(),
            avatar: default_avatar_budget(),
            edit: default_edit_budget(),
            music: default_music_budget(),
            image: default_image_budget(),
        }
    }
}

impl BudgetConfig {
    pub fn secs(&self, modality: Modality) -> u64 {
        match modality {
            Modality::Video => self.video,
            Modality::Avatar => self.avatar,
            Modality::Edit => self.edit,
            Modality::Music => self.music,
            Modality::Image => self.image,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylesConfig {
    #[serde(default = "default_style")]
    pub default: String,
}

fn default_style() -> String {
    DEFAULT_STYLE_ID.to_string()
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            default: default_style(),
        }
    }
}
