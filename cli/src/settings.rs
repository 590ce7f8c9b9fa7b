//! Effective runtime settings: CLI flags over environment over config file
//! over built-in defaults.

use ocpapi_client::DEFAULT_BASE_URL;
use ocpapi_client::retry::RetryConfig;
use ocpapi_config::OcpConfig;
use ocpapi_workflows::WaitOptions;

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub retry: RetryConfig,
    pub wait: WaitOptions,
}

impl Settings {
    pub fn resolve(flag: Option<&str>, env: Option<String>, config: Option<&OcpConfig>) -> Self {
        let base_url = flag
            .map(str::to_string)
            .or(env)
            .or_else(|| config.and_then(OcpConfig::base_url))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut retry = RetryConfig::default();
        if let Some(section) = config.and_then(|c| c.retry.as_ref()) {
            if let Some(max_attempts) = section.max_attempts {
                retry.max_attempts = max_attempts;
            }
            if let Some(fixed_wait) = section.fixed_wait() {
                retry.fixed_wait = fixed_wait;
            }
            if let Some(max_jitter) = section.max_jitter() {
                retry.max_jitter = max_jitter;
            }
        }

        let mut wait = WaitOptions {
            retry: retry.clone(),
            ..WaitOptions::default()
        };
        if let Some(section) = config.and_then(|c| c.polling.as_ref()) {
            if let Some(slow) = section.slow_interval() {
                wait.slow_interval = slow;
            }
            if let Some(fast) = section.fast_interval() {
                wait.fast_interval = fast;
            }
        }

        Self {
            base_url,
            retry,
            wait,
        }
    }
}
