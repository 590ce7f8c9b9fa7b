//! Async client for the Open Catalyst API.
//!
//! # Architecture
//!
//! [`Client`] exposes each route of the API as one async method. Every method
//! sends a single request and maps the outcome to a typed model from
//! [`ocpapi_types`] or a [`RequestError`]:
//!
//! | Outcome | Error |
//! |---------|-------|
//! | No response (connect, timeout, TLS) | [`RequestError::Transport`] |
//! | 429 | [`RequestError::RateLimitExceeded`] |
//! | Other 4xx | [`RequestError::NonRetryable`] |
//! | Other status >= 300 | [`RequestError::Retryable`] |
//! | 2xx with an undecodable body | [`RequestError::InvalidResponse`] |
//!
//! Methods do not retry on their own. Wrap calls with
//! [`retry::retry_api_calls`] to apply the retry policy.

mod error;
pub mod retry;

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

pub use error::RequestError;
pub use ocpapi_types;
use ocpapi_types::{
    AdsorbateSlabConfigs, AdsorbateSlabRelaxationsRequest, AdsorbateSlabRelaxationsResults,
    AdsorbateSlabRelaxationsSystem, Adsorbates, Bulk, Bulks, Slab, Slabs, SubmitRelaxations,
};

/// Production OCP API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://open-catalyst-api.metademolab.com/ocp/";

const CONNECT_TIMEOUT_SECS: u64 = 30;

// Note: reqwest only exposes tcp_keepalive (idle time); interval/retries use platform defaults.
const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_MAX_IDLE_PER_HOST: usize = 100;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Shared HTTP client with connection pooling.
#[must_use]
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!("Failed to build tuned HTTP client: {e}. Falling back to defaults.");
            reqwest::Client::new()
        })
    })
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(concat!("ocpapi-rust/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

/// Read an error response body, keeping at most 32 KiB.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// A bulk given either by its source id or as a fetched [`Bulk`].
#[derive(Debug, Clone, Copy)]
pub struct BulkId<'a>(&'a str);

impl BulkId<'_> {
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0
    }
}

impl<'a> From<&'a str> for BulkId<'a> {
    fn from(value: &'a str) -> Self {
        Self(value)
    }
}

impl<'a> From<&'a String> for BulkId<'a> {
    fn from(value: &'a String) -> Self {
        Self(value)
    }
}

impl<'a> From<&'a Bulk> for BulkId<'a> {
    fn from(value: &'a Bulk) -> Self {
        Self(&value.src_id)
    }
}

/// Exposes each route in the OCP API as a method.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Client {
    /// Create a client for `base_url` that shares the process-wide
    /// connection pool.
    #[must_use]
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self::with_http_client(base_url, http_client().clone())
    }

    #[must_use]
    pub fn with_http_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Self {
        // All routes below are appended with a leading '/'.
        let base_url = base_url.as_ref().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host (and port, when not the default) of the base URL.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        let url = Url::parse(&self.base_url).ok()?;
        let host = url.host_str()?;
        Some(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }

    /// Fetch the list of bulk materials that are supported in the API.
    pub async fn get_bulks(&self) -> Result<Bulks, RequestError> {
        let url = self.route(&Method::GET, "bulks")?;
        self.send_json(Method::GET, url, None::<&()>).await
    }

    /// Fetch the list of adsorbates that are supported in the API.
    pub async fn get_adsorbates(&self) -> Result<Adsorbates, RequestError> {
        let url = self.route(&Method::GET, "adsorbates")?;
        self.send_json(Method::GET, url, None::<&()>).await
    }

    /// Get a unique list of slabs for the input bulk structure.
    pub async fn get_slabs<'a>(&self, bulk: impl Into<BulkId<'a>>) -> Result<Slabs, RequestError> {
        let bulk = bulk.into();
        let url = self.route(&Method::POST, "slabs")?;
        let body = json!({ "bulk_src_id": bulk.as_str() });
        self.send_json(Method::POST, url, Some(&body)).await
    }

    /// Get a list of possible binding sites for `adsorbate` (a SMILES
    /// string) on `slab`.
    pub async fn get_adsorbate_slab_configs(
        &self,
        adsorbate: &str,
        slab: &Slab,
    ) -> Result<AdsorbateSlabConfigs, RequestError> {
        let url = self.route(&Method::POST, "adsorbate-slab-configs")?;
        let body = json!({ "adsorbate": adsorbate, "slab": slab });
        self.send_json(Method::POST, url, Some(&body)).await
    }

    /// Start relaxations of the submitted adsorbate configurations.
    ///
    /// Relaxations run asynchronously on the server; poll for results with
    /// the returned system id.
    pub async fn submit_adsorbate_slab_relaxations(
        &self,
        request: &SubmitRelaxations<'_>,
    ) -> Result<AdsorbateSlabRelaxationsSystem, RequestError> {
        let url = self.route(&Method::POST, "adsorbate-slab-relaxations")?;
        self.send_json(Method::POST, url, Some(request)).await
    }

    /// Fetch the original relaxations request for a system.
    pub async fn get_adsorbate_slab_relaxations_request(
        &self,
        system_id: &str,
    ) -> Result<AdsorbateSlabRelaxationsRequest, RequestError> {
        let url = self.route(
            &Method::GET,
            &format!("adsorbate-slab-relaxations/{system_id}"),
        )?;
        self.send_json(Method::GET, url, None::<&()>).await
    }

    /// Fetch relaxation results for a system.
    ///
    /// Empty `config_ids` fetches every configuration; empty `fields` fetches
    /// every field.
    pub async fn get_adsorbate_slab_relaxations_results(
        &self,
        system_id: &str,
        config_ids: &[i64],
        fields: &[&str],
    ) -> Result<AdsorbateSlabRelaxationsResults, RequestError> {
        let mut url = self.route(
            &Method::GET,
            &format!("adsorbate-slab-relaxations/{system_id}/configs"),
        )?;
        // Only touch the query when there is something to add; an empty
        // query_pairs_mut() leaves a dangling '?'.
        if !fields.is_empty() || !config_ids.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for field in fields {
                pairs.append_pair("field", field);
            }
            for config_id in config_ids {
                pairs.append_pair("config_id", &config_id.to_string());
            }
        }
        self.send_json(Method::GET, url, None::<&()>).await
    }

    /// Delete all relaxation results for a system. Only ephemeral systems can
    /// be deleted.
    pub async fn delete_adsorbate_slab_relaxations(
        &self,
        system_id: &str,
    ) -> Result<(), RequestError> {
        let url = self.route(
            &Method::DELETE,
            &format!("adsorbate-slab-relaxations/{system_id}"),
        )?;
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    fn route(&self, method: &Method, path: &str) -> Result<Url, RequestError> {
        let raw = format!("{}/{path}", self.base_url);
        Url::parse(&raw).map_err(|source| RequestError::InvalidUrl {
            method: method.clone(),
            url: raw,
            source,
        })
    }

    async fn send_json<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (method, url, text) = self.send(method, url, body).await?;
        serde_json::from_str(&text).map_err(|source| RequestError::InvalidResponse {
            method,
            url: url.to_string(),
            source,
        })
    }

    /// Send one request and return its body when the status is below 300.
    async fn send<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<(Method, Url, String), RequestError>
    where
        B: Serialize + ?Sized,
    {
        tracing::debug!(method = %method, url = %url, "Sending OCP API request");

        let mut builder = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => {
                return Err(RequestError::Transport {
                    method,
                    url: url.to_string(),
                    source,
                });
            }
        };

        let status = response.status();
        if status.as_u16() < 300 {
            return match response.text().await {
                Ok(text) => Ok((method, url, text)),
                Err(source) => Err(RequestError::Transport {
                    method,
                    url: url.to_string(),
                    source,
                }),
            };
        }

        tracing::debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            "OCP API call failed"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry::parse_retry_after(response.headers());
            return Err(RequestError::RateLimitExceeded {
                method,
                url: url.to_string(),
                retry_after,
            });
        }

        let body = read_capped_error_body(response).await;
        if status.is_client_error() {
            Err(RequestError::NonRetryable {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                body,
            })
        } else {
            Err(RequestError::Retryable {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }
}
