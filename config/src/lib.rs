//! Configuration file for the `ocpapi` client.
//!
//! The file lives at `~/.ocpapi/config.toml`. Every section and every key is
//! optional:
//!
//! ```toml
//! [api]
//! base_url = "${OCP_API_URL}"
//!
//! [retry]
//! max_attempts = 5
//! fixed_wait_secs = 2.0
//! max_jitter_secs = 1.0
//!
//! [polling]
//! slow_interval_secs = 30.0
//! fast_interval_secs = 10.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Environment variable that overrides `[api] base_url`.
pub const BASE_URL_ENV: &str = "OCPAPI_BASE_URL";

#[derive(Debug, Default, Deserialize)]
pub struct OcpConfig {
    pub api: Option<ApiConfig>,
    pub retry: Option<RetryConfig>,
    pub polling: Option<PollingConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: TomlError,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path.as_path(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API. Supports `${VAR}` expansion.
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub fixed_wait_secs: Option<f64>,
    pub max_jitter_secs: Option<f64>,
}

impl RetryConfig {
    #[must_use]
    pub fn fixed_wait(&self) -> Option<Duration> {
        self.fixed_wait_secs.and_then(secs_to_duration)
    }

    #[must_use]
    pub fn max_jitter(&self) -> Option<Duration> {
        self.max_jitter_secs.and_then(secs_to_duration)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PollingConfig {
    pub slow_interval_secs: Option<f64>,
    pub fast_interval_secs: Option<f64>,
}

impl PollingConfig {
    #[must_use]
    pub fn slow_interval(&self) -> Option<Duration> {
        self.slow_interval_secs.and_then(secs_to_duration)
    }

    #[must_use]
    pub fn fast_interval(&self) -> Option<Duration> {
        self.fast_interval_secs.and_then(secs_to_duration)
    }
}

fn secs_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Replace every `${VAR}` with the value of `VAR`, or nothing when unset.
///
/// Unclosed `${` and empty `${}` are kept as written.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(0) => {
                out.push_str("${}");
                rest = &after[1..];
            }
            Some(end) => {
                out.push_str(&env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

impl OcpConfig {
    /// Load the config from its default location.
    ///
    /// A missing file, or no home directory, is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// `[api] base_url` with env vars expanded. Blank values count as unset.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        let raw = self.api.as_ref()?.base_url.as_deref()?;
        let expanded = expand_env_vars(raw);
        let trimmed = expanded.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Base URL from `OCPAPI_BASE_URL`, when set and non-blank.
#[must_use]
pub fn env_base_url() -> Option<String> {
    env::var(BASE_URL_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ocpapi").join("config.toml"))
}
