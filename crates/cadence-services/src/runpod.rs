//! Client for the external GPU job service (RunPod serverless).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cadence_core::models::TranscodingJobInput;
use cadence_core::AppError;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Longest slice of an upstream response body kept in error messages.
const ERROR_BODY_PREVIEW_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum JobClientError {
    #[error("job service is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("job submission timed out after {0:?}")]
    Timeout(Duration),

    #[error("job submission failed: {0}")]
    Request(String),

    #[error("job service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("job service returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl From<JobClientError> for AppError {
    fn from(err: JobClientError) -> Self {
        AppError::ExternalService(err.to_string())
    }
}

/// Handle returned by a confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub job_id: String,
    pub status: Option<String>,
}

/// Submits transcoding jobs. Injected into the transcoding service so tests
/// can substitute a fake.
#[async_trait]
pub trait TranscodingJobClient: Send + Sync {
    async fn submit(&self, input: &TranscodingJobInput) -> Result<SubmittedJob, JobClientError>;
}

#[derive(Debug, Clone)]
pub struct RunpodClientConfig {
    pub api_base_url: String,
    pub endpoint_id: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    input: &'a TranscodingJobInput,
}

#[derive(Deserialize)]
struct RunResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Clone)]
pub struct RunpodClient {
    http_client: Client,
    config: RunpodClientConfig,
}

impl RunpodClient {
    pub fn new(config: RunpodClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to create HTTP client for job submission")?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn run_url(&self, endpoint_id: &str) -> String {
        format!(
            "{}/{}/run",
            self.config.api_base_url.trim_end_matches('/'),
            endpoint_id
        )
    }
}

#[async_trait]
impl TranscodingJobClient for RunpodClient {
    #[tracing::instrument(skip(self, input), fields(media_id = %input.media_id, media_type = %input.media_type))]
    async fn submit(&self, input: &TranscodingJobInput) -> Result<SubmittedJob, JobClientError> {
        let endpoint_id = self
            .config
            .endpoint_id
            .as_deref()
            .ok_or(JobClientError::NotConfigured("RUNPOD_ENDPOINT_ID"))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(JobClientError::NotConfigured("RUNPOD_API_KEY"))?;

        let response = self
            .http_client
            .post(self.run_url(endpoint_id))
            .bearer_auth(api_key)
            .header("User-Agent", "Cadence-Transcoding/1.0")
            .json(&RunRequest { input })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    JobClientError::Timeout(self.config.timeout)
                } else {
                    JobClientError::Request(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_PREVIEW_LEN).collect();
            tracing::warn!(status = status.as_u16(), "Job service rejected submission");
            return Err(JobClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RunResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                JobClientError::Timeout(self.config.timeout)
            } else {
                JobClientError::InvalidResponse(e.without_url().to_string())
            }
        })?;

        let job_id = parsed
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| JobClientError::InvalidResponse("missing job id".to_string()))?;

        tracing::info!(job_id = %job_id, status = ?parsed.status, "Transcoding job submitted");

        Ok(SubmittedJob {
            job_id,
            status: parsed.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::models::{JobOutputKeys, MediaType};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn job_input() -> TranscodingJobInput {
        TranscodingJobInput {
            media_id: "m1".to_string(),
            creator_id: "c1".to_string(),
            media_type: MediaType::Video,
            input_key: "c1/originals/m1/video.mp4".to_string(),
            webhook_url: "https://media.example.com/webhooks/runpod".to_string(),
            priority: 3,
            outputs: JobOutputKeys {
                hls_prefix: "c1/hls/m1/".to_string(),
                hls_master_key: "c1/hls/m1/master.m3u8".to_string(),
                hls_preview_key: Some("c1/hls/m1/preview/preview.m3u8".to_string()),
                thumbnail_key: Some("c1/thumbnails/m1/auto-generated.jpg".to_string()),
                waveform_key: None,
                waveform_image_key: None,
                mezzanine_key: Some("c1/mezzanine/m1/mezzanine.mp4".to_string()),
            },
        }
    }

    fn client(base: String, timeout: Duration) -> RunpodClient {
        RunpodClient::new(RunpodClientConfig {
            api_base_url: base,
            endpoint_id: Some("endpoint-1".to_string()),
            api_key: Some("rp_test_key".to_string()),
            timeout,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_submit_returns_job_id() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/endpoint-1/run"))
            .and(header("authorization", "Bearer rp_test_key"))
            .and(body_partial_json(serde_json::json!({
                "input": {
                    "mediaId": "m1",
                    "type": "video",
                    "inputKey": "c1/originals/m1/video.mp4",
                    "priority": 3
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "job-42", "status": "IN_QUEUE"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let job = client(mock_server.uri(), Duration::from_secs(5))
            .submit(&job_input())
            .await
            .unwrap();
        assert_eq!(job.job_id, "job-42");
        assert_eq!(job.status.as_deref(), Some("IN_QUEUE"));
    }

    #[tokio::test]
    async fn test_submit_payload_carries_no_credentials() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "job-1"})))
            .mount(&mock_server)
            .await;

        client(mock_server.uri(), Duration::from_secs(5))
            .submit(&job_input())
            .await
            .unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let input = body["input"].as_object().unwrap();
        for forbidden in [
            "webhookSecret",
            "r2AccessKeyId",
            "r2SecretAccessKey",
            "b2AccessKeyId",
            "b2SecretAccessKey",
        ] {
            assert!(!input.contains_key(forbidden), "{forbidden} leaked");
        }
        assert!(!body.to_string().contains("rp_test_key"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = client(mock_server.uri(), Duration::from_secs(5))
            .submit(&job_input())
            .await
            .unwrap_err();
        assert!(matches!(err, JobClientError::Status { status: 503, .. }));
        assert!(matches!(AppError::from(err), AppError::ExternalService(_)));
    }

    #[tokio::test]
    async fn test_missing_job_id_is_invalid_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "IN_QUEUE"})))
            .mount(&mock_server)
            .await;

        let err = client(mock_server.uri(), Duration::from_secs(5))
            .submit(&job_input())
            .await
            .unwrap_err();
        assert!(matches!(err, JobClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "job-late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let err = client(mock_server.uri(), Duration::from_millis(200))
            .submit(&job_input())
            .await
            .unwrap_err();
        assert!(matches!(err, JobClientError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_client_never_sends() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = RunpodClient::new(RunpodClientConfig {
            api_base_url: mock_server.uri(),
            endpoint_id: None,
            api_key: Some("key".to_string()),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let err = client.submit(&job_input()).await.unwrap_err();
        assert!(matches!(err, JobClientError::NotConfigured("RUNPOD_ENDPOINT_ID")));
    }
}
