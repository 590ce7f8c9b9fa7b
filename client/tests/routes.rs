//! Route-level tests against a local mock server.

use std::net::TcpListener;
use std::time::Duration;

use ocpapi_client::retry::{RetryConfig, retry_api_calls};
use ocpapi_client::{Client, RequestError};
use ocpapi_types::{Model, Slab, SubmitRelaxations};
use reqwest::Method;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::timeout;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn atoms() -> serde_json::Value {
    json!({
        "cell": [[1.1, 0.0, 0.0], [0.0, 2.2, 0.0], [0.0, 0.0, 3.3]],
        "pbc": [true, false, true],
        "numbers": [1, 2],
        "positions": [[1.1, 1.2, 1.3], [1.4, 1.5, 1.6]],
        "tags": [2, 2]
    })
}

fn slab() -> serde_json::Value {
    json!({
        "atoms": atoms(),
        "metadata": {"bulk_src_id": "mp-30", "millers": [1, 1, 1], "shift": 0.5, "top": false}
    })
}

fn bulk() -> serde_json::Value {
    json!({"src_id": "mp-30", "formula": "Cu", "elements": ["Cu"]})
}

fn client_for(server: &MockServer) -> Client {
    // Trailing slash mirrors the production default.
    Client::new(format!("{}/ocp/", server.uri()))
}

#[tokio::test]
async fn get_bulks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocp/bulks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bulks_supported": [bulk()]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let bulks = client_for(&server).get_bulks().await.unwrap();
    assert_eq!(bulks.bulks_supported.len(), 1);
    assert_eq!(bulks.bulks_supported[0].formula, "Cu");
}

#[tokio::test]
async fn get_adsorbates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocp/adsorbates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "adsorbates_supported": ["*CO", "*OH"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adsorbates = client_for(&server).get_adsorbates().await.unwrap();
    assert!(adsorbates.contains("*OH"));
    assert!(!adsorbates.contains("*N2"));
}

#[tokio::test]
async fn get_slabs_posts_bulk_src_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ocp/slabs"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"bulk_src_id": "mp-30"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"slabs": [slab()]})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let by_id = client.get_slabs("mp-30").await.unwrap();
    assert_eq!(by_id.slabs[0].metadata.millers, (1, 1, 1));

    let bulk: ocpapi_types::Bulk = serde_json::from_value(bulk()).unwrap();
    let by_bulk = client.get_slabs(&bulk).await.unwrap();
    assert_eq!(by_id, by_bulk);
}

#[tokio::test]
async fn get_adsorbate_slab_configs_posts_slab() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ocp/adsorbate-slab-configs"))
        .and(body_json(json!({"adsorbate": "*CO", "slab": slab()})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "adsorbate_configs": [atoms()],
            "slab": slab()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let slab: Slab = serde_json::from_value(slab()).unwrap();
    let configs = client_for(&server)
        .get_adsorbate_slab_configs("*CO", &slab)
        .await
        .unwrap();
    assert_eq!(configs.adsorbate_configs.len(), 1);
    assert_eq!(configs.slab, slab);
}

#[tokio::test]
async fn submit_adsorbate_slab_relaxations_posts_full_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ocp/adsorbate-slab-relaxations"))
        .and(body_json(json!({
            "adsorbate": "*CO",
            "adsorbate_configs": [atoms()],
            "bulk": bulk(),
            "slab": slab(),
            "model": "equiformer_v2_153M_s2ef_all_md",
            "ephemeral": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "system_id": "sys-1",
            "config_ids": [0]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let configs = vec![serde_json::from_value(atoms()).unwrap()];
    let bulk = serde_json::from_value(bulk()).unwrap();
    let slab = serde_json::from_value(slab()).unwrap();
    let system = client_for(&server)
        .submit_adsorbate_slab_relaxations(&SubmitRelaxations {
            adsorbate: "*CO",
            adsorbate_configs: &configs,
            bulk: &bulk,
            slab: &slab,
            model: Model::EquiformerV2S2efAllMd,
            ephemeral: true,
        })
        .await
        .unwrap();

    assert_eq!(system.system_id, "sys-1");
    assert_eq!(system.config_ids, vec![0]);
}

#[tokio::test]
async fn get_adsorbate_slab_relaxations_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocp/adsorbate-slab-relaxations/sys-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "adsorbate": "*CO",
            "adsorbate_configs": [atoms()],
            "bulk": bulk(),
            "slab": slab(),
            "model": "gemnet_oc_base_s2ef_all_md",
            "ephemeral": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = client_for(&server)
        .get_adsorbate_slab_relaxations_request("sys-1")
        .await
        .unwrap();
    assert_eq!(request.model, Model::GemnetOcBaseS2efAllMd);
    assert_eq!(request.ephemeral, Some(false));
}

#[tokio::test]
async fn get_results_without_filters_sends_no_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocp/adsorbate-slab-relaxations/sys-1/configs"))
        .and(query_param_is_missing("field"))
        .and(query_param_is_missing("config_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "configs": [{"config_id": 0, "status": "success", "energy": -2.0}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = client_for(&server)
        .get_adsorbate_slab_relaxations_results("sys-1", &[], &[])
        .await
        .unwrap();
    assert_eq!(results.configs[0].energy, Some(-2.0));
}

#[tokio::test]
async fn get_results_with_filters_repeats_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocp/adsorbate-slab-relaxations/sys-1/configs"))
        .and(query_param("field", "energy"))
        .and(query_param("field", "forces"))
        .and(query_param("config_id", "1"))
        .and(query_param("config_id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "configs": [
                {"config_id": 1, "status": "success", "energy": -1.0, "forces": [[0.0, 0.0, 0.0]]},
                {"config_id": 2, "status": "failed_relaxation"}
            ],
            "omitted_config_ids": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = client_for(&server)
        .get_adsorbate_slab_relaxations_results("sys-1", &[1, 2], &["energy", "forces"])
        .await
        .unwrap();
    assert_eq!(results.configs.len(), 2);
}

#[tokio::test]
async fn delete_adsorbate_slab_relaxations() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/ocp/adsorbate-slab-relaxations/sys-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .delete_adsorbate_slab_relaxations("sys-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn rate_limit_maps_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocp/bulks"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1.5"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_bulks().await.unwrap_err();
    match &err {
        RequestError::RateLimitExceeded { retry_after, .. } => {
            assert_eq!(*retry_after, Some(Duration::from_millis(1500)));
        }
        other => panic!("expected RateLimitExceeded, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(*err.method(), Method::GET);
    assert_eq!(err.url(), format!("{}/ocp/bulks", server.uri()));
}

#[tokio::test]
async fn rate_limit_without_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocp/bulks"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client_for(&server).get_bulks().await.unwrap_err();
    assert!(matches!(
        err,
        RequestError::RateLimitExceeded {
            retry_after: None,
            ..
        }
    ));
}

#[tokio::test]
async fn client_error_is_non_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/ocp/adsorbate-slab-relaxations/keep-me"))
        .respond_with(ResponseTemplate::new(403).set_body_string("not ephemeral"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .delete_adsorbate_slab_relaxations("keep-me")
        .await
        .unwrap_err();
    match &err {
        RequestError::NonRetryable { status, body, .. } => {
            assert_eq!(*status, 403);
            assert_eq!(body, "not ephemeral");
        }
        other => panic!("expected NonRetryable, got {other:?}"),
    }
    assert!(err.to_string().contains("Unexpected response code: 403"));
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocp/adsorbates"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_adsorbates().await.unwrap_err();
    assert!(matches!(err, RequestError::Retryable { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn undecodable_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocp/bulks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_bulks().await.unwrap_err();
    assert!(matches!(err, RequestError::InvalidResponse { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn connection_failure_is_transport_error() {
    // Bind to learn a free port, then drop the listener so nothing accepts.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = Client::new(format!("http://127.0.0.1:{port}/ocp"))
        .get_bulks()
        .await
        .unwrap_err();
    assert!(matches!(err, RequestError::Transport { .. }));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("Exception while making request"));
}

#[tokio::test]
async fn retry_recovers_from_rate_limit() {
    let server = MockServer::start().await;
    let attempt = AtomicU32::new(0);
    Mock::given(method("GET"))
        .and(path("/ocp/bulks"))
        .respond_with(move |_: &wiremock::Request| {
            if attempt.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(429).insert_header("Retry-After", "0.01")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"bulks_supported": []}))
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let config = RetryConfig {
        max_attempts: 3,
        fixed_wait: Duration::from_secs(60),
        max_jitter: Duration::ZERO,
    };
    // A 60s fixed wait would time the test out; the Retry-After hint must win.
    let bulks = timeout(
        Duration::from_secs(10),
        retry_api_calls(&config, || client.get_bulks()),
    )
    .await
    .expect("retry should honor Retry-After")
    .unwrap();
    assert!(bulks.bulks_supported.is_empty());
}
