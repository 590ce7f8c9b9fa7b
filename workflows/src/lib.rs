//! Higher-level flows built on [`ocpapi_client::Client`].
//!
//! - [`find_adsorbate_binding_sites`] - search every surface of a bulk for
//!   the lowest-energy placements of an adsorbate
//! - [`wait_for_adsorbate_slab_relaxations`] - poll until a system finishes
//! - [`get_adsorbate_slab_relaxation_results`] - fetch results, following up
//!   on configs the server omitted
//! - [`get_results_ui_url`] - link to the results page for a system
//!
//! Every API call made here goes through
//! [`ocpapi_client::retry::retry_api_calls`].

mod binding_sites;
mod filter;
mod results;

use thiserror::Error;
use url::Url;

pub use binding_sites::{
    AdsorbateBindingSites, AdsorbateSlabRelaxations, FindBindingSites, Lifetime,
    find_adsorbate_binding_sites,
};
pub use filter::{AdslabFilter, KeepAllSlabs, KeepSlabsWithMillerIndices};
pub use results::{
    WaitOptions, get_adsorbate_slab_relaxation_results, wait_for_adsorbate_slab_relaxations,
};

use ocpapi_client::RequestError;

/// Host of the production API.
pub const PROD_API_HOST: &str = "open-catalyst-api.metademolab.com";

const RESULTS_UI_BASE_URL: &str = "https://open-catalyst.metademolab.com/results/";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("adsorbate '{0}' is not supported by the API")]
    UnsupportedAdsorbate(String),

    #[error("bulk '{0}' is not supported by the API")]
    UnsupportedBulk(String),

    #[error("results for system {system_id} stopped making progress; still omitted: {omitted:?}")]
    NoProgress {
        system_id: String,
        omitted: Vec<i64>,
    },
}

/// Results page for `system_id`, when `api_host` is the production API.
///
/// Other hosts (staging, local servers) have no public results UI.
#[must_use]
pub fn get_results_ui_url(api_host: &str, system_id: &str) -> Option<Url> {
    if api_host != PROD_API_HOST {
        return None;
    }
    let mut url = Url::parse(RESULTS_UI_BASE_URL).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(system_id);
    Some(url)
}
