//! Official Kling API, authenticated with a short-lived HS256 JWT.

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::KlingProvider;
use crate::error::{AdapterError, ConfigError};
use crate::providers::extract::{first_string, normalize_state};
use crate::providers::http::{send_json, CallKind};
use crate::providers::Adapter;
use crate::types::{ProviderRequest, ProviderState, RawStatus, TaskId, ToolId};

pub const DEFAULT_BASE_URL: &str = "https://api.klingai.com";

const NAME: &str = "kling";
const TOKEN_TTL_SECS: i64 = 1800;
const NOT_BEFORE_SKEW_SECS: i64 = 5;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    exp: i64,
    nbf: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    TextToVideo,
    ImageToVideo,
}

impl Endpoint {
    fn path(&self) -> &'static str {
        match self {
            Endpoint::TextToVideo => "/v1/videos/text2video",
            Endpoint::ImageToVideo => "/v1/videos/image2video",
        }
    }
}

pub struct KlingAdapter {
    http: Client,
    base_url: String,
    model: String,
    access_key: Option<SecretString>,
    secret_key: Option<SecretString>,
}

impl KlingAdapter {
    pub fn new(
        http: Client,
        access_key: Option<SecretString>,
        secret_key: Option<SecretString>,
    ) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "kling-v1-6".to_string(),
            access_key,
            secret_key,
        }
    }

    pub fn from_config(http: Client, config: &KlingProvider) -> Result<Self, ConfigError> {
        let resolve = |source: &crate::secrets::CredentialSource| {
            source.resolve().map_err(|source| ConfigError::Credential {
                provider: NAME.to_string(),
                source,
            })
        };
        let mut adapter = Self::new(
            http,
            resolve(&config.access_key)?,
            resolve(&config.secret_key)?,
        );
        adapter.model = config.model.clone();
        if let Some(url) = &config.base_url {
            adapter = adapter.with_base_url(url);
        }
        Ok(adapter)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Signs a fresh token; tokens are never cached.
    fn bearer_token(&self) -> Result<String, AdapterError> {
        let (Some(access), Some(secret)) = (&self.access_key, &self.secret_key) else {
            return Err(AdapterError::missing_credentials(NAME));
        };

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: access.expose_secret(),
            exp: now + TOKEN_TTL_SECS,
            nbf: now - NOT_BEFORE_SKEW_SECS,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AdapterError::Configuration {
            provider: NAME.to_string(),
            reason: format!("failed to sign token: {}", e),
        })
    }

    fn payload(&self, request: &ProviderRequest<'_>, image: Option<&str>) -> Value {
        let duration = if request.duration_or(5) >= 10 { "10" } else { "5" };
        let mut payload = json!({
            "model_name": self.model,
            "prompt": request.enhanced_prompt(),
            "duration": duration,
            "aspect_ratio": request.request.aspect_ratio.as_str(),
            "mode": "std",
        });
        if let Some(negative) = request.request.negative_prompt.as_deref() {
            payload["negative_prompt"] = json!(negative);
        }
        if let Some(url) = image {
            payload["image"] = json!(url);
        }
        payload
    }

    async fn query(&self, endpoint: Endpoint, task_id: &TaskId) -> Result<Value, AdapterError> {
        let token = self.bearer_token()?;
        let url = format!("{}{}/{}", self.base_url, endpoint.path(), task_id);
        let body = send_json(
            NAME,
            self.http.get(&url).bearer_auth(token),
            CallKind::Poll,
        )
        .await?;
        check_body_code(&body)?;
        Ok(body)
    }
}

/// Kling reports failures as a non-zero `code` in the body.
fn check_body_code(body: &Value) -> Result<(), AdapterError> {
    let code = body.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code == 0 {
        return Ok(());
    }

    let message = first_string(body, &["/message"]).unwrap_or_else(|| format!("code {}", code));
    let provider = NAME.to_string();
    Err(match code {
        1000..=1004 => AdapterError::AuthOrQuota {
            provider,
            status: 401,
            message,
        },
        1100..=1103 => AdapterError::AuthOrQuota {
            provider,
            status: 402,
            message,
        },
        1302 | 1303 => AdapterError::Transient { provider, message },
        c if c >= 5000 => AdapterError::Transient { provider, message },
        _ => AdapterError::Rejected {
            provider,
            status: 400,
            message,
        },
    })
}

#[async_trait]
impl Adapter for KlingAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn tool(&self) -> ToolId {
        ToolId::Kling
    }

    fn is_available(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }

    async fn submit(&self, request: &ProviderRequest<'_>) -> Result<TaskId, AdapterError> {
        let token = self.bearer_token()?;
        let image = request
            .request
            .source_image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty());
        let endpoint = if image.is_some() {
            Endpoint::ImageToVideo
        } else {
            Endpoint::TextToVideo
        };

        let url = format!("{}{}", self.base_url, endpoint.path());
        let body = send_json(
            NAME,
            self.http
                .post(&url)
                .bearer_auth(token)
                .json(&self.payload(request, image)),
            CallKind::Submit,
        )
        .await?;
        check_body_code(&body)?;

        first_string(&body, &["/data/task_id"])
            .map(TaskId::new)
            .ok_or_else(|| AdapterError::Protocol {
                provider: NAME.to_string(),
                message: "response has no data.task_id".to_string(),
            })
    }

    async fn poll(&self, task_id: &TaskId) -> Result<RawStatus, AdapterError> {
        // The task id doesn't say which endpoint created it.
        let body = match self.query(Endpoint::TextToVideo, task_id).await {
            Err(AdapterError::Rejected { status: 404, .. }) => {
                self.query(Endpoint::ImageToVideo, task_id).await?
            }
            other => other?,
        };

        let state = first_string(&body, &["/data/task_status"])
            .map(|s| normalize_state(&s))
            .unwrap_or(ProviderState::Unknown);

        Ok(RawStatus {
            state,
            progress: None,
            result_url: first_string(&body, &["/data/task_result/videos/*/url"]),
            error: first_string(&body, &["/data/task_status_msg"]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct DecodedClaims {
        iss: String,
        exp: i64,
        nbf: i64,
    }

    fn adapter() -> KlingAdapter {
        KlingAdapter::new(
            Client::new(),
            Some(SecretString::from("ak-test")),
            Some(SecretString::from("sk-test")),
        )
    }

    #[test]
    fn test_token_claims() {
        let token = adapter().bearer_token().unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        let decoded = decode::<DecodedClaims>(
            &token,
            &DecodingKey::from_secret(b"sk-test"),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.iss, "ak-test");
        assert_eq!(decoded.claims.exp - decoded.claims.nbf, 1805);
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let adapter = KlingAdapter::new(Client::new(), Some(SecretString::from("ak")), None);
        assert!(!adapter.is_available());
        assert!(matches!(
            adapter.bearer_token(),
            Err(AdapterError::Configuration { .. })
        ));
    }

    #[test]
    fn test_body_codes() {
        assert!(check_body_code(&json!({"code": 0})).is_ok());
        assert!(matches!(
            check_body_code(&json!({"code": 1102, "message": "balance not enough"})),
            Err(AdapterError::AuthOrQuota { status: 402, .. })
        ));
        assert!(matches!(
            check_body_code(&json!({"code": 1001})),
            Err(AdapterError::AuthOrQuota { status: 401, .. })
        ));
        assert!(matches!(
            check_body_code(&json!({"code": 5001})),
            Err(AdapterError::Transient { .. })
        ));
        assert!(matches!(
            check_body_code(&json!({"code": 1201, "message": "bad prompt"})),
            Err(AdapterError::Rejected { .. })
        ));
    }
}
