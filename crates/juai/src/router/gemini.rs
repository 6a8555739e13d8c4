//! Google Gemini as a [`TextModel`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use super::model::{ModelError, TextModel};
use crate::config::GeminiProvider;
use crate::error::ConfigError;
use crate::providers::extract::first_string;
use crate::providers::http::sanitize_error_body;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiModel {
    http: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    timeout: Duration,
}

impl GeminiModel {
    pub fn new(http: Client, api_key: SecretString, model: &str) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            api_key,
            timeout: Duration::from_secs(15),
        }
    }

    /// `Ok(None)` when no key is configured: routing then stays keyword-only.
    pub fn from_config(http: Client, config: &GeminiProvider) -> Result<Option<Self>, ConfigError> {
        let api_key = config
            .api_key
            .resolve()
            .map_err(|source| ConfigError::Credential {
                provider: "gemini".to_string(),
                source,
            })?;

        let Some(api_key) = api_key else {
            log::info!("No Gemini API key, intent routing is keyword-only");
            return Ok(None);
        };

        let mut model = Self::new(http, api_key, &config.model)
            .with_timeout(Duration::from_secs(config.timeout_secs));
        if let Some(url) = &config.base_url {
            model = model.with_base_url(url);
        }
        Ok(Some(model))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Request(e.without_url().to_string()))?;
        if !status.is_success() {
            return Err(ModelError::Request(format!(
                "HTTP {}: {}",
                status.as_u16(),
                sanitize_error_body(&text)
            )));
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|e| ModelError::ResponseParse(e.to_string()))?;
        first_string(&value, &["/candidates/0/content/parts/0/text"])
            .ok_or_else(|| ModelError::ResponseParse("response has no candidate text".to_string()))
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        tokio::time::timeout(self.timeout, self.generate(prompt))
            .await
            .map_err(|_| ModelError::Timeout)?
    }
}
