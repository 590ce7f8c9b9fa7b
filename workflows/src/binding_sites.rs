use std::fmt;
use std::str::FromStr;

use futures_util::future::{join_all, try_join_all};
use ocpapi_client::Client;
use ocpapi_client::retry::{RetryConfig, retry_api_calls};
use ocpapi_types::{
    AdsorbateSlabConfigs, AdsorbateSlabRelaxationResult, Bulk, Model, Slab, Status,
    SubmitRelaxations,
};
use serde::Serialize;

use crate::filter::{AdslabFilter, KeepAllSlabs};
use crate::results::{
    WaitOptions, get_adsorbate_slab_relaxation_results, wait_for_adsorbate_slab_relaxations,
};
use crate::{WorkflowError, get_results_ui_url};

/// What happens to submitted relaxations once their results are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// Keep results on the server permanently.
    #[default]
    Save,
    /// Keep results for now, but allow them to be deleted later.
    MarkEphemeral,
    /// Delete results from the server after fetching them.
    Delete,
}

const LIFETIME_VALUES: &[&str] = &["save", "ephemeral", "delete"];

impl Lifetime {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Lifetime::Save => "save",
            Lifetime::MarkEphemeral => "ephemeral",
            Lifetime::Delete => "delete",
        }
    }

    /// Value of the `ephemeral` flag sent with the submission.
    #[must_use]
    pub const fn is_ephemeral(self) -> bool {
        !matches!(self, Lifetime::Save)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "save" => Ok(Lifetime::Save),
            "ephemeral" | "mark_ephemeral" | "mark-ephemeral" => Ok(Lifetime::MarkEphemeral),
            "delete" => Ok(Lifetime::Delete),
            other => Err(format!(
                "invalid lifetime '{other}'; expected one of: {LIFETIME_VALUES:?}"
            )),
        }
    }
}

/// Relaxations of every adsorbate placement on one slab.
#[derive(Debug, Clone, Serialize)]
pub struct AdsorbateSlabRelaxations {
    pub slab: Slab,
    pub configs: Vec<AdsorbateSlabRelaxationResult>,
    pub system_id: String,
    pub api_host: String,
    /// Results page, when the API host has one and the results were kept.
    pub ui_url: Option<String>,
}

impl AdsorbateSlabRelaxations {
    /// Lowest-energy successful configuration on this slab.
    #[must_use]
    pub fn lowest_energy(&self) -> Option<&AdsorbateSlabRelaxationResult> {
        self.configs
            .iter()
            .filter(|c| c.status == Status::Success)
            .filter_map(|c| c.energy.map(|energy| (energy, c)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, config)| config)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdsorbateBindingSites {
    /// SMILES string of the adsorbate.
    pub adsorbate: String,
    pub bulk: Bulk,
    pub model: Model,
    pub slabs: Vec<AdsorbateSlabRelaxations>,
}

/// Inputs to [`find_adsorbate_binding_sites`].
pub struct FindBindingSites<'a> {
    pub adsorbate: &'a str,
    pub bulk_src_id: &'a str,
    pub model: Model,
    pub adslab_filter: &'a dyn AdslabFilter,
    pub lifetime: Lifetime,
    pub retry: RetryConfig,
    /// Shared by every slab; a progress channel sees updates from all of
    /// them interleaved.
    pub wait: WaitOptions,
}

impl<'a> FindBindingSites<'a> {
    #[must_use]
    pub fn new(adsorbate: &'a str, bulk_src_id: &'a str, model: Model) -> Self {
        Self {
            adsorbate,
            bulk_src_id,
            model,
            adslab_filter: &KeepAllSlabs,
            lifetime: Lifetime::default(),
            retry: RetryConfig::default(),
            wait: WaitOptions::default(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: &'a dyn AdslabFilter) -> Self {
        self.adslab_filter = filter;
        self
    }

    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }
}

/// Search all surfaces of a bulk for placements of an adsorbate and relax
/// them with the requested model.
///
/// 1. Check the adsorbate and bulk are supported.
/// 2. Enumerate slabs of the bulk and generate placements on each one.
/// 3. Apply the slab filter.
/// 4. Relax every remaining slab concurrently, wait for completion and fetch
///    the results.
///
/// With [`Lifetime::Delete`], every submitted system is deleted even when
/// waiting or fetching fails, and a failing slab does not cancel the others.
/// The first error is returned once every slab has finished.
pub async fn find_adsorbate_binding_sites(
    client: &Client,
    request: &FindBindingSites<'_>,
) -> Result<AdsorbateBindingSites, WorkflowError> {
    let retry = &request.retry;

    let adsorbates = retry_api_calls(retry, || client.get_adsorbates()).await?;
    if !adsorbates.contains(request.adsorbate) {
        return Err(WorkflowError::UnsupportedAdsorbate(
            request.adsorbate.to_string(),
        ));
    }

    let bulks = retry_api_calls(retry, || client.get_bulks()).await?;
    let bulk = bulks
        .find(request.bulk_src_id)
        .cloned()
        .ok_or_else(|| WorkflowError::UnsupportedBulk(request.bulk_src_id.to_string()))?;

    let slabs = retry_api_calls(retry, || client.get_slabs(&bulk)).await?;
    tracing::info!(
        bulk = %bulk.src_id,
        slabs = slabs.slabs.len(),
        "Generating adsorbate placements"
    );

    let adslabs = try_join_all(slabs.slabs.iter().map(|slab| {
        retry_api_calls(retry, move || {
            client.get_adsorbate_slab_configs(request.adsorbate, slab)
        })
    }))
    .await?;

    let adslabs = request.adslab_filter.filter(adslabs);
    tracing::info!(
        slabs = adslabs.len(),
        configs = adslabs
            .iter()
            .map(|a| a.adsorbate_configs.len())
            .sum::<usize>(),
        model = %request.model,
        "Submitting relaxations"
    );

    let host = client.host().unwrap_or_default();
    let relaxed = join_all(
        adslabs
            .iter()
            .map(|adslab| relax_adslab(client, request, &bulk, adslab, &host)),
    )
    .await
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;

    Ok(AdsorbateBindingSites {
        adsorbate: request.adsorbate.to_string(),
        bulk,
        model: request.model,
        slabs: relaxed,
    })
}

async fn wait_and_fetch(
    client: &Client,
    request: &FindBindingSites<'_>,
    system_id: &str,
) -> Result<Vec<AdsorbateSlabRelaxationResult>, WorkflowError> {
    wait_for_adsorbate_slab_relaxations(client, system_id, &request.wait).await?;
    get_adsorbate_slab_relaxation_results(client, system_id, &[], &[], &request.retry).await
}

/// Results page for a relaxed system. Deleted systems have none.
fn results_ui_url(lifetime: Lifetime, host: &str, system_id: &str) -> Option<String> {
    if lifetime == Lifetime::Delete {
        return None;
    }
    get_results_ui_url(host, system_id).map(String::from)
}

async fn relax_adslab(
    client: &Client,
    request: &FindBindingSites<'_>,
    bulk: &Bulk,
    adslab: &AdsorbateSlabConfigs,
    host: &str,
) -> Result<AdsorbateSlabRelaxations, WorkflowError> {
    let retry = &request.retry;
    let submission = SubmitRelaxations {
        adsorbate: request.adsorbate,
        adsorbate_configs: &adslab.adsorbate_configs,
        bulk,
        slab: &adslab.slab,
        model: request.model,
        ephemeral: request.lifetime.is_ephemeral(),
    };

    let system = retry_api_calls(retry, || {
        client.submit_adsorbate_slab_relaxations(&submission)
    })
    .await?;
    let system_id = system.system_id;
    tracing::info!(
        system_id = %system_id,
        millers = ?adslab.slab.metadata.millers,
        top = adslab.slab.metadata.top,
        configs = system.config_ids.len(),
        "Submitted relaxations"
    );

    let outcome = wait_and_fetch(client, request, &system_id).await;

    if request.lifetime == Lifetime::Delete {
        let deleted = retry_api_calls(retry, || {
            client.delete_adsorbate_slab_relaxations(&system_id)
        })
        .await;
        match deleted {
            Ok(()) => tracing::debug!(system_id = %system_id, "Deleted relaxations"),
            Err(err) if outcome.is_ok() => return Err(err.into()),
            Err(err) => {
                tracing::warn!(system_id = %system_id, "Failed to delete relaxations: {err}");
            }
        }
    }

    let configs = outcome?;
    let ui_url = results_ui_url(request.lifetime, host, &system_id);

    Ok(AdsorbateSlabRelaxations {
        slab: adslab.slab.clone(),
        configs,
        system_id,
        api_host: host.to_string(),
        ui_url,
    })
}

#[cfg(test)]
mod tests {
    use super::{Lifetime, results_ui_url};
    use crate::PROD_API_HOST;

    #[test]
    fn lifetime_ephemeral_flag() {
        assert!(!Lifetime::Save.is_ephemeral());
        assert!(Lifetime::MarkEphemeral.is_ephemeral());
        assert!(Lifetime::Delete.is_ephemeral());
    }

    #[test]
    fn lifetime_parse() {
        assert_eq!("SAVE".parse::<Lifetime>().unwrap(), Lifetime::Save);
        assert_eq!(
            "ephemeral".parse::<Lifetime>().unwrap(),
            Lifetime::MarkEphemeral
        );
        assert_eq!("delete".parse::<Lifetime>().unwrap(), Lifetime::Delete);
        assert!("forever".parse::<Lifetime>().is_err());
    }

    #[test]
    fn ui_url_only_for_kept_production_results() {
        let expected = "https://open-catalyst.metademolab.com/results/sys-1";
        assert_eq!(
            results_ui_url(Lifetime::Save, PROD_API_HOST, "sys-1").as_deref(),
            Some(expected)
        );
        assert_eq!(
            results_ui_url(Lifetime::MarkEphemeral, PROD_API_HOST, "sys-1").as_deref(),
            Some(expected)
        );
        assert!(results_ui_url(Lifetime::Delete, PROD_API_HOST, "sys-1").is_none());
        assert!(results_ui_url(Lifetime::Save, "127.0.0.1:8080", "sys-1").is_none());
    }
}
