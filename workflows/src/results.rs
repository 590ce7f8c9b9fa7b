use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use ocpapi_client::Client;
use ocpapi_client::retry::{RetryConfig, retry_api_calls};
use ocpapi_types::{AdsorbateSlabRelaxationResult, Status};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::WorkflowError;

/// Polling cadence for [`wait_for_adsorbate_slab_relaxations`].
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Poll without waiting first.
    pub check_immediately: bool,
    /// Interval while no relaxation has finished yet.
    pub slow_interval: Duration,
    /// Interval once at least one relaxation has finished.
    pub fast_interval: Duration,
    pub retry: RetryConfig,
    /// Receives `(finished, total)` after every poll.
    pub progress: Option<watch::Sender<(usize, usize)>>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            check_immediately: false,
            slow_interval: Duration::from_secs(30),
            fast_interval: Duration::from_secs(10),
            retry: RetryConfig::default(),
            progress: None,
        }
    }
}

/// Fetch results for `system_id`, following up on every config the server
/// left out of a response.
///
/// Results come back in the order the server returned them; follow-up pages
/// are appended. A follow-up page that leaves the same ids omitted fails
/// with [`WorkflowError::NoProgress`].
pub async fn get_adsorbate_slab_relaxation_results(
    client: &Client,
    system_id: &str,
    config_ids: &[i64],
    fields: &[&str],
    retry: &RetryConfig,
) -> Result<Vec<AdsorbateSlabRelaxationResult>, WorkflowError> {
    let first = retry_api_calls(retry, || {
        client.get_adsorbate_slab_relaxations_results(system_id, config_ids, fields)
    })
    .await?;

    let mut configs = first.configs;
    let mut omitted = first.omitted_config_ids;

    while !omitted.is_empty() {
        tracing::debug!(
            system_id,
            omitted = omitted.len(),
            "Fetching omitted relaxation results"
        );
        let page = retry_api_calls(retry, || {
            client.get_adsorbate_slab_relaxations_results(system_id, &omitted, fields)
        })
        .await?;

        let unchanged = page.omitted_config_ids.iter().collect::<BTreeSet<_>>()
            == omitted.iter().collect::<BTreeSet<_>>();
        if unchanged {
            return Err(WorkflowError::NoProgress {
                system_id: system_id.to_string(),
                omitted,
            });
        }

        configs.extend(page.configs);
        omitted = page.omitted_config_ids;
    }

    Ok(configs)
}

/// Poll until no configuration in `system_id` is still running.
///
/// Returns the final status of every configuration, keyed by config id.
pub async fn wait_for_adsorbate_slab_relaxations(
    client: &Client,
    system_id: &str,
    options: &WaitOptions,
) -> Result<BTreeMap<i64, Status>, WorkflowError> {
    let mut wait = if options.check_immediately {
        Duration::ZERO
    } else {
        options.slow_interval
    };

    loop {
        if !wait.is_zero() {
            sleep(wait).await;
        }

        let results = get_adsorbate_slab_relaxation_results(
            client,
            system_id,
            &[],
            &["status"],
            &options.retry,
        )
        .await?;
        let statuses: BTreeMap<i64, Status> = results
            .into_iter()
            .map(|config| (config.config_id, config.status))
            .collect();

        let total = statuses.len();
        let finished = statuses.values().filter(|s| s.is_finished()).count();
        tracing::info!(system_id, finished, total, "Relaxation progress");
        if let Some(progress) = &options.progress {
            // No receivers just means nobody is watching.
            let _ = progress.send((finished, total));
        }

        if finished == total {
            return Ok(statuses);
        }

        wait = if finished > 0 {
            options.fast_interval
        } else {
            options.slow_interval
        };
    }
}
