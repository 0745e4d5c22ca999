//! Test helpers: build the router over the in-memory store and a fake job
//! client, plus request signing.
//!
//! Run from workspace root: `cargo test -p cadence-api`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use cadence_api::setup::routes;
use cadence_api::state::AppState;
use cadence_core::models::TranscodingJobInput;
use cadence_core::Config;
use cadence_db::InMemoryMediaItemStore;
use cadence_services::{
    canonical_request, sign, JobClientError, SignatureVerifier, SubmittedJob, TranscodingJobClient,
    TranscodingService, TranscodingServiceConfig,
};
use chrono::Utc;

pub const INTERNAL_SECRET: &str = "test-internal-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Returns `job-{n}` for the n-th submission, starting at 1, unless told to fail.
#[derive(Default)]
pub struct FakeJobClient {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub fixed_job_id: Option<String>,
}

impl FakeJobClient {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscodingJobClient for FakeJobClient {
    async fn submit(&self, _input: &TranscodingJobInput) -> Result<SubmittedJob, JobClientError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(JobClientError::Timeout(std::time::Duration::from_secs(15)));
        }
        Ok(SubmittedJob {
            job_id: self
                .fixed_job_id
                .clone()
                .unwrap_or_else(|| format!("job-{n}")),
            status: Some("IN_QUEUE".to_string()),
        })
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryMediaItemStore,
    pub job_client: Arc<FakeJobClient>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config() -> Config {
    Config {
        server_port: 3000,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        database_url: "postgresql://localhost/cadence_test".to_string(),
        db_max_connections: 1,
        db_timeout_seconds: 1,
        internal_signing_secret: Some(INTERNAL_SECRET.to_string()),
        runpod_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        runpod_api_key: None,
        runpod_endpoint_id: None,
        runpod_api_base_url: "http://127.0.0.1:9".to_string(),
        runpod_submit_timeout_secs: 1,
        webhook_base_url: "https://media.example.com".to_string(),
        signature_max_skew_secs: 300,
        transcoding_review_threshold: 3,
        max_request_body_bytes: 64 * 1024,
    }
}

pub fn setup_test_app(job_client: FakeJobClient) -> TestApp {
    let config = test_config();
    let store = InMemoryMediaItemStore::new();
    let job_client = Arc::new(job_client);

    let transcoding = TranscodingService::new(
        Arc::new(store.clone()),
        job_client.clone(),
        SignatureVerifier::new(
            "webhook",
            config.runpod_webhook_secret.clone(),
            config.signature_max_skew_secs,
        ),
        TranscodingServiceConfig {
            webhook_url: config.webhook_url(),
            review_threshold: config.transcoding_review_threshold,
        },
    )
    .expect("transcoding service");

    let state = Arc::new(AppState {
        transcoding,
        internal_verifier: SignatureVerifier::new(
            "internal",
            config.internal_signing_secret.clone(),
            config.signature_max_skew_secs,
        ),
        pool: None,
    });

    let router = routes::setup_routes(&config, state).expect("router");
    let server = TestServer::new(router).expect("test server");

    TestApp {
        server,
        store,
        job_client,
    }
}

/// `(timestamp, signature)` header values for `body` signed now.
pub fn signature_headers(secret: &str, body: &[u8]) -> (String, String) {
    let ts = Utc::now().timestamp();
    let sig = sign(secret, body, ts).expect("sign");
    (ts.to_string(), sig)
}

/// Header values for an internal request to `target` (path and query).
pub fn internal_signature_headers(
    secret: &str,
    method: &str,
    target: &str,
    body: &[u8],
) -> (String, String) {
    signature_headers(secret, &canonical_request(method, target, body))
}
