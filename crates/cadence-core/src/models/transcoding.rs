//! Transcoding job and webhook contract types.
//!
//! The job input and webhook payload use camelCase because they are the wire
//! contract with the external GPU worker. Renaming a field here is a breaking
//! change for that worker.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::media_item::{MediaItem, MediaStatus, MediaType, MezzanineStatus};

/// Who is asking for a transcoding operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    /// An end-user principal; must own the media item.
    Creator(String),
    /// A trusted internal worker acting without a user identity.
    InternalService,
}

impl Requester {
    pub fn from_requester_id(requester_id: Option<String>) -> Self {
        match requester_id {
            Some(id) if !id.trim().is_empty() => Requester::Creator(id),
            _ => Requester::InternalService,
        }
    }

    pub fn may_access(&self, item: &MediaItem) -> bool {
        match self {
            Requester::InternalService => true,
            Requester::Creator(id) => item.is_owned_by(id),
        }
    }
}

/// Destination keys the worker must write to. Computed by the orchestrator
/// so the worker never chooses where its outputs land.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobOutputKeys {
    pub hls_prefix: String,
    pub hls_master_key: String,
    pub hls_preview_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub waveform_key: Option<String>,
    pub waveform_image_key: Option<String>,
    pub mezzanine_key: Option<String>,
}

/// `input` object of a job submission. Carries keys and paths only:
/// the worker holds its own storage credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscodingJobInput {
    pub media_id: String,
    pub creator_id: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub input_key: String,
    pub webhook_url: String,
    pub priority: i32,
    pub outputs: JobOutputKeys,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WebhookJobStatus {
    #[serde(alias = "COMPLETED")]
    Completed,
    #[serde(alias = "FAILED")]
    Failed,
}

/// Callback body sent by the external job service.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(default, alias = "id")]
    pub job_id: Option<String>,
    pub status: Option<WebhookJobStatus>,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub output: Option<WebhookOutput>,
    #[serde(default)]
    pub error: Option<String>,
    /// Result fields sent at the top level instead of under `output`.
    #[serde(flatten)]
    pub inline_output: WebhookOutput,
}

impl WebhookPayload {
    /// Reported results, whether nested under `output` or inline.
    pub fn result(&self) -> &WebhookOutput {
        self.output.as_ref().unwrap_or(&self.inline_output)
    }

    /// Correlation id of the target media item, preferring the one reported
    /// inside `output`.
    pub fn media_id(&self) -> Option<&str> {
        self.output
            .as_ref()
            .and_then(|o| o.media_id.as_deref())
            .or(self.media_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Failure message from the top level, falling back to `output.error`.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.output.as_ref().and_then(|o| o.error.as_deref()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutput {
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default, alias = "hlsMasterPlaylistKey")]
    pub hls_master_key: Option<String>,
    #[serde(default)]
    pub hls_preview_key: Option<String>,
    #[serde(default)]
    pub thumbnail_key: Option<String>,
    #[serde(default)]
    pub waveform_key: Option<String>,
    #[serde(default)]
    pub waveform_image_key: Option<String>,
    #[serde(default)]
    pub mezzanine_key: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Any JSON number; range is checked when the outputs are accepted.
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub ready_variants: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Derived metadata written to the media item on successful completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscodingOutputs {
    pub hls_master_playlist_key: Option<String>,
    pub hls_preview_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub waveform_key: Option<String>,
    pub waveform_image_key: Option<String>,
    pub duration_seconds: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub ready_variants: Vec<String>,
    pub mezzanine_key: Option<String>,
    pub mezzanine_status: Option<MezzanineStatus>,
}

/// How a webhook delivery was classified. Informational only: the
/// caller receives 200 for every outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WebhookOutcome {
    /// Terminal transition applied.
    Applied,
    /// Record already left `transcoding`, or a concurrent delivery won.
    Duplicate,
    /// Job id does not match the record's current job.
    Stale,
    /// No record matches the payload.
    Orphaned,
    /// Payload could not be interpreted.
    Rejected,
    /// Processing failed after authentication; logged internally.
    Errored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied => "applied",
            WebhookOutcome::Duplicate => "duplicate",
            WebhookOutcome::Stale => "stale",
            WebhookOutcome::Orphaned => "orphaned",
            WebhookOutcome::Rejected => "rejected",
            WebhookOutcome::Errored => "errored",
        }
    }
}

/// Body of the internal trigger and retry endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscodingRequest {
    pub media_id: String,
    /// Creator on whose behalf the call is made. Omit for internal callers.
    #[serde(default)]
    pub requester_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranscodingJobResponse {
    pub accepted: bool,
    pub media_id: String,
    pub job_id: String,
    pub status: MediaStatus,
    pub transcoding_attempts: i32,
    pub needs_operator_review: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranscodingStatusResponse {
    pub media_id: String,
    pub status: MediaStatus,
    pub media_type: MediaType,
    pub transcoding_attempts: i32,
    pub transcoding_error: Option<String>,
    pub ready_variants: Vec<String>,
    pub hls_master_playlist_key: Option<String>,
    pub duration_seconds: Option<i32>,
    pub mezzanine_status: Option<MezzanineStatus>,
    pub needs_operator_review: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: WebhookOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_payload_accepts_nested_output() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "jobId": "job-42",
            "status": "completed",
            "output": {
                "mediaId": "m1",
                "durationSeconds": 120,
                "width": 1920,
                "height": 1080,
                "hlsMasterKey": "c1/hls/m1/master.m3u8"
            }
        }))
        .unwrap();

        assert_eq!(payload.job_id.as_deref(), Some("job-42"));
        assert_eq!(payload.status, Some(WebhookJobStatus::Completed));
        assert_eq!(payload.media_id(), Some("m1"));
        let output = payload.output.unwrap();
        assert_eq!(output.duration_seconds, Some(120.0));
        assert_eq!(output.hls_master_key.as_deref(), Some("c1/hls/m1/master.m3u8"));
        assert!(output.ready_variants.is_empty());
    }

    #[test]
    fn oversized_dimensions_still_deserialize() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "jobId": "job-42",
            "status": "completed",
            "output": { "mediaId": "m1", "width": 9_999_999_999_u64, "height": -5 }
        }))
        .unwrap();

        let output = payload.output.unwrap();
        assert_eq!(output.width, Some(9_999_999_999.0));
        assert_eq!(output.height, Some(-5.0));
    }

    #[test]
    fn webhook_payload_accepts_runpod_native_fields() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "id": "job-7",
            "status": "FAILED",
            "mediaId": "m2",
            "output": { "hlsMasterPlaylistKey": "c1/hls/m2/master.m3u8", "error": "boom" }
        }))
        .unwrap();

        assert_eq!(payload.job_id.as_deref(), Some("job-7"));
        assert_eq!(payload.status, Some(WebhookJobStatus::Failed));
        assert_eq!(payload.media_id(), Some("m2"));
        assert_eq!(payload.error_message(), Some("boom"));
        assert_eq!(
            payload.result().hls_master_key.as_deref(),
            Some("c1/hls/m2/master.m3u8")
        );
    }

    #[test]
    fn webhook_payload_accepts_flat_worker_result() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "jobId": "job-9",
            "status": "completed",
            "mediaId": "m3",
            "hlsMasterPlaylistKey": "c1/hls/m3/master.m3u8",
            "waveformKey": "c1/waveforms/m3/waveform.json",
            "durationSeconds": 61,
            "readyVariants": ["128k", "64k"],
            "error": null
        }))
        .unwrap();

        assert!(payload.output.is_none());
        assert_eq!(payload.media_id(), Some("m3"));
        let result = payload.result();
        assert_eq!(result.hls_master_key.as_deref(), Some("c1/hls/m3/master.m3u8"));
        assert_eq!(result.waveform_key.as_deref(), Some("c1/waveforms/m3/waveform.json"));
        assert_eq!(result.duration_seconds, Some(61.0));
        assert_eq!(result.ready_variants, vec!["128k", "64k"]);
    }

    #[test]
    fn job_input_serializes_type_field() {
        let input = TranscodingJobInput {
            media_id: "m1".into(),
            creator_id: "c1".into(),
            media_type: MediaType::Video,
            input_key: "c1/originals/m1/video.mp4".into(),
            webhook_url: "https://media.example.com/webhooks/runpod".into(),
            priority: 0,
            outputs: JobOutputKeys {
                hls_prefix: "c1/hls/m1/".into(),
                hls_master_key: "c1/hls/m1/master.m3u8".into(),
                hls_preview_key: None,
                thumbnail_key: None,
                waveform_key: None,
                waveform_image_key: None,
                mezzanine_key: None,
            },
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["inputKey"], "c1/originals/m1/video.mp4");
        assert_eq!(json["outputs"]["hlsMasterKey"], "c1/hls/m1/master.m3u8");
    }

    #[test]
    fn requester_from_blank_id_is_internal() {
        assert_eq!(
            Requester::from_requester_id(Some("  ".into())),
            Requester::InternalService
        );
        assert_eq!(
            Requester::from_requester_id(Some("c1".into())),
            Requester::Creator("c1".into())
        );
    }
}
