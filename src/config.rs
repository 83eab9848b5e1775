//! Annotator configuration.
//!
//! Values come from an optional TOML file, then environment variables
//! override individual fields:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `INTENT_API_BASE_URL` | `api_base_url` |
//! | `INTENT_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` |
//! | `INTENT_TAXONOMY_PATH` | `taxonomy_path` |
//! | `INTENT_SPEECH_LANGUAGE` | `speech_language` |
//! | `INTENT_HISTORY_PATH` | `history_path` |

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;
use crate::speech::DEFAULT_SPEECH_LANGUAGE;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api/";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_BASE_URL: &str = "INTENT_API_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "INTENT_REQUEST_TIMEOUT_SECS";
pub const ENV_TAXONOMY_PATH: &str = "INTENT_TAXONOMY_PATH";
pub const ENV_SPEECH_LANGUAGE: &str = "INTENT_SPEECH_LANGUAGE";
pub const ENV_HISTORY_PATH: &str = "INTENT_HISTORY_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotatorConfig {
    /// Base URL of the classifier / label / persistence services.
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Local taxonomy file; when absent the taxonomy is fetched from the service.
    pub taxonomy_path: Option<PathBuf>,
    /// BCP 47 tag handed to [`SpeechCapture::from_config`](crate::SpeechCapture::from_config).
    pub speech_language: String,
    /// User context file read by [`UserContext::load_configured`](crate::UserContext::load_configured).
    pub history_path: Option<PathBuf>,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            taxonomy_path: None,
            speech_language: DEFAULT_SPEECH_LANGUAGE.to_string(),
            history_path: None,
        }
    }
}

impl AnnotatorConfig {
    /// Read a TOML file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// File, then environment overrides, then validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(raw) = get(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs =
                raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    field: "request_timeout_secs",
                    message: format!("{} is not a whole number of seconds: {:?}", ENV_REQUEST_TIMEOUT_SECS, raw),
                })?;
        }
        if let Some(path) = get(ENV_TAXONOMY_PATH) {
            self.taxonomy_path = Some(PathBuf::from(path));
        }
        if let Some(language) = get(ENV_SPEECH_LANGUAGE) {
            self.speech_language = language;
        }
        if let Some(path) = get(ENV_HISTORY_PATH) {
            self.history_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api_base_url",
                message: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `api_base_url` joined with an endpoint name, with exactly one `/` between.
    pub fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            name.trim_start_matches('/')
        )
    }
}
