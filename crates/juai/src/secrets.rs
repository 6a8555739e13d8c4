//! Provider credential resolution from multiple sources.
//!
//! Credentials are looked up in priority order so the same config file works
//! locally and in a container:
//!
//! 1. **Direct value** - e.g. `apiKey: "sk-..."` for quick local testing
//! 2. **File reference** - e.g. `apiKeyFile: /run/secrets/goapi`
//! 3. **Env var reference** - e.g. `apiKeyEnvVar: GOAPI_KEY`
//!
//! A credential whose env var is simply unset resolves to `None`; the adapter
//! then reports itself unavailable instead of failing the whole config.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("No credential source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read credential from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Where one credential comes from. Field names follow the config file's
/// camelCase convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
}

impl CredentialSource {
    pub fn from_env(name: &str) -> Self {
        Self {
            env_var: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn direct(value: &str) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        has_secret_source(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        )
    }

    /// Resolves the credential. An unset env var or an empty value yields
    /// `None`; an unreadable file is an error.
    pub fn resolve(&self) -> Result<Option<SecretString>> {
        match resolve_secret(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        ) {
            Ok(secret) => {
                use secrecy::ExposeSecret;
                if secret.expose_secret().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(secret))
                }
            }
            Err(CredentialError::NoSourceProvided) => Ok(None),
            Err(CredentialError::EnvVarNotSet { name }) => {
                log::debug!("Credential env var '{}' is not set", name);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Resolves a secret from the first non-empty source:
/// direct value, then file contents, then environment variable.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            return match fs::read_to_string(&expanded) {
                Ok(content) => Ok(SecretString::from(content.trim().to_string())),
                Err(e) => Err(CredentialError::FileReadError {
                    path: expanded,
                    source: e,
                }),
            };
        }
    }

    if let Some(var_name) = env_var {
        if !var_name.is_empty() {
            return match std::env::var(var_name) {
                // Env vars may carry trailing newlines
                Ok(value) => Ok(SecretString::from(value.trim())),
                Err(std::env::VarError::NotPresent) => Err(CredentialError::EnvVarNotSet {
                    name: var_name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => {
                    Err(CredentialError::EnvVarNotUnicode {
                        name: var_name.to_string(),
                    })
                }
            };
        }
    }

    Err(CredentialError::NoSourceProvided)
}

pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    direct.is_some_and(|s| !s.is_empty())
        || file_path.is_some_and(|s| !s.is_empty())
        || env_var.is_some_and(|s| !s.is_empty())
}

/// Expands a leading `~` to the current user's home directory.
/// `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            if path == "~" {
                return home.into_owned();
            }
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
