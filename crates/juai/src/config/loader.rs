use std::path::{Path, PathBuf};

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;
use crate::types::Modality;

/// `<platform config dir>/juai/config.yaml`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("juai").join("config.yaml"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    log::debug!("Loaded config from {}", path.display());
    load_config_from_str(&content)
}

/// Parses YAML (or JSON) config text and validates it.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let interval = config.polling.interval_secs;
    if interval == 0 {
        return Err(ConfigError::Validation {
            message: "polling.intervalSecs must be greater than 0".to_string(),
        });
    }

    for modality in Modality::ALL {
        let budget = config.polling.budgets.secs(modality);
        if budget < interval {
            return Err(ConfigError::Validation {
                message: format!(
                    "polling.budgets.{} ({}s) is shorter than the poll interval ({}s)",
                    modality, budget, interval
                ),
            });
        }
    }

    if config.http.connect_timeout_secs == 0 || config.http.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "http timeouts must be greater than 0".to_string(),
        });
    }

    if config.providers.gemini.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "providers.gemini.timeoutSecs must be greater than 0".to_string(),
        });
    }

    Ok(())
}
