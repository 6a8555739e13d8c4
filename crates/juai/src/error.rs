use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::{Modality, ToolId};

/// Stable, caller-facing error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ConfigurationError,
    TransientProviderError,
    QuotaOrAuthError,
    ValidationError,
    TimeoutBudgetExceeded,
    ProviderRejected,
    NotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigurationError => "configuration_error",
            ErrorCode::TransientProviderError => "transient_provider_error",
            ErrorCode::QuotaOrAuthError => "quota_or_auth_error",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::TimeoutBudgetExceeded => "timeout_budget_exceeded",
            ErrorCode::ProviderRejected => "provider_rejected",
            ErrorCode::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the surrounding server layer is allowed to see of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Credential for '{provider}' could not be resolved: {source}")]
    Credential {
        provider: String,
        #[source]
        source: crate::secrets::CredentialError,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors returned by provider adapters, classified so callers can decide
/// whether a retry or a fallback makes sense.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("{provider} is not configured: {reason}")]
    Configuration { provider: String, reason: String },

    #[error("{provider} rejected credentials or quota (HTTP {status}): {message}")]
    AuthOrQuota {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} is temporarily unavailable: {message}")]
    Transient { provider: String, message: String },

    #[error("{provider} rejected the request (HTTP {status}): {message}")]
    Rejected {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Invalid request for {provider}: {message}")]
    Validation { provider: String, message: String },

    #[error("{provider} returned an unreadable response: {message}")]
    Protocol { provider: String, message: String },
}

impl AdapterError {
    pub fn missing_credentials(provider: &str) -> Self {
        AdapterError::Configuration {
            provider: provider.to_string(),
            reason: "credentials are not set".to_string(),
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            AdapterError::Configuration { provider, .. }
            | AdapterError::AuthOrQuota { provider, .. }
            | AdapterError::Transient { provider, .. }
            | AdapterError::Rejected { provider, .. }
            | AdapterError::Validation { provider, .. }
            | AdapterError::Protocol { provider, .. } => provider,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AdapterError::Configuration { .. } => ErrorCode::ConfigurationError,
            AdapterError::AuthOrQuota { .. } => ErrorCode::QuotaOrAuthError,
            AdapterError::Transient { .. } | AdapterError::Protocol { .. } => {
                ErrorCode::TransientProviderError
            }
            AdapterError::Rejected { .. } => ErrorCode::ProviderRejected,
            AdapterError::Validation { .. } => ErrorCode::ValidationError,
        }
    }

    /// Whether the dispatcher may substitute another adapter after this error.
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            AdapterError::Transient { .. } | AdapterError::Configuration { .. }
        )
    }

    /// Whether a poll that failed this way should simply be retried on the
    /// next tick.
    pub fn is_retryable_poll(&self) -> bool {
        matches!(
            self,
            AdapterError::Transient { .. } | AdapterError::Protocol { .. }
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No provider configured for {modality} ({tool})")]
    NoProviderConfigured { modality: Modality, tool: ToolId },

    #[error("{tool} is configured without fallback and its provider failed: {source}")]
    FallbackDisabled {
        tool: ToolId,
        #[source]
        source: AdapterError,
    },

    #[error(transparent)]
    Failed(AdapterError),

    #[error("{tool} failed on both providers. primary: {primary}; fallback: {fallback}")]
    Exhausted {
        tool: ToolId,
        primary: AdapterError,
        fallback: AdapterError,
    },
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::NoProviderConfigured { .. } => ErrorCode::ConfigurationError,
            DispatchError::FallbackDisabled { source, .. } => source.code(),
            DispatchError::Failed(source) => source.code(),
            DispatchError::Exhausted { fallback, .. } => fallback.code(),
        }
    }
}

/// Errors surfaced by the orchestration facade.
#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Job '{0}' not found")]
    JobNotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] AdapterError),
}

impl StudioError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StudioError::Validation(_) => ErrorCode::ValidationError,
            StudioError::Dispatch(e) => e.code(),
            StudioError::JobNotFound(_) => ErrorCode::NotFound,
            StudioError::Config(_) => ErrorCode::ConfigurationError,
            StudioError::Provider(e) => e.code(),
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
