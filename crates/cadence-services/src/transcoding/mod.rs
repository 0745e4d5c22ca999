//! Transcoding state machine.
//!
//! `uploaded -> transcoding` (trigger), `failed -> transcoding` (retry) and
//! `transcoding -> ready | failed` (webhook). State only changes through the
//! conditional updates of [`MediaItemStore`]; a job is always confirmed by the
//! external service before the record moves.

mod outputs;
mod sanitize;
mod webhook;

use std::sync::Arc;

use anyhow::Result;
use cadence_core::models::{
    MediaItem, MediaStatus, MediaType, MezzanineStatus, Requester, TranscodingJobInput,
    TranscodingJobResponse, TranscodingStatusResponse,
};
use cadence_core::AppError;
use cadence_db::MediaItemStore;
use cadence_storage::keys;

use crate::runpod::TranscodingJobClient;
use crate::signature::SignatureVerifier;

pub use outputs::{accept_outputs, job_output_keys};
pub use sanitize::ErrorSanitizer;

#[derive(Debug, Clone)]
pub struct TranscodingServiceConfig {
    /// Callback URL handed to the job service.
    pub webhook_url: String,
    /// Attempts at which a media item is flagged for operator review.
    pub review_threshold: i32,
}

#[derive(Clone)]
pub struct TranscodingService {
    store: Arc<dyn MediaItemStore>,
    job_client: Arc<dyn TranscodingJobClient>,
    webhook_verifier: SignatureVerifier,
    sanitizer: ErrorSanitizer,
    config: TranscodingServiceConfig,
}

impl TranscodingService {
    pub fn new(
        store: Arc<dyn MediaItemStore>,
        job_client: Arc<dyn TranscodingJobClient>,
        webhook_verifier: SignatureVerifier,
        config: TranscodingServiceConfig,
    ) -> Result<Self> {
        Ok(Self {
            store,
            job_client,
            webhook_verifier,
            sanitizer: ErrorSanitizer::new()?,
            config,
        })
    }

    /// Start transcoding an uploaded media item.
    #[tracing::instrument(skip_all, fields(media_id = %media_id))]
    pub async fn trigger_job(
        &self,
        media_id: &str,
        requester: &Requester,
    ) -> Result<TranscodingJobResponse, AppError> {
        let item = self.load_authorized(media_id, requester).await?;
        if item.status != MediaStatus::Uploaded {
            return Err(AppError::InvalidState(format!(
                "Media item must be in '{}' state to start transcoding (current: '{}')",
                MediaStatus::Uploaded,
                item.status
            )));
        }

        let updated = self.submit_and_record(&item, MediaStatus::Uploaded).await?;
        tracing::info!(
            job_id = ?updated.runpod_job_id,
            attempts = updated.transcoding_attempts,
            "Transcoding started"
        );
        Ok(self.job_response(&updated))
    }

    /// Re-submit a failed media item. Attempts are never capped here; reaching
    /// the review threshold only flags the item.
    #[tracing::instrument(skip_all, fields(media_id = %media_id))]
    pub async fn retry_job(
        &self,
        media_id: &str,
        requester: &Requester,
    ) -> Result<TranscodingJobResponse, AppError> {
        let item = self.load_authorized(media_id, requester).await?;
        if item.status != MediaStatus::Failed {
            return Err(AppError::InvalidState(format!(
                "Media item must be in '{}' state to retry transcoding (current: '{}')",
                MediaStatus::Failed,
                item.status
            )));
        }

        let previous_job_id = item.runpod_job_id.clone();
        let updated = self.submit_and_record(&item, MediaStatus::Failed).await?;
        let response = self.job_response(&updated);
        if response.needs_operator_review {
            tracing::warn!(
                attempts = updated.transcoding_attempts,
                threshold = self.config.review_threshold,
                "Transcoding retried past review threshold"
            );
        }
        tracing::info!(
            job_id = ?updated.runpod_job_id,
            previous_job_id = ?previous_job_id,
            attempts = updated.transcoding_attempts,
            "Transcoding retried"
        );
        Ok(response)
    }

    /// Current transcoding state with a display-safe error.
    #[tracing::instrument(skip_all, fields(media_id = %media_id))]
    pub async fn status(
        &self,
        media_id: &str,
        requester: &Requester,
    ) -> Result<TranscodingStatusResponse, AppError> {
        let item = self.load_authorized(media_id, requester).await?;
        let transcoding_error = item
            .transcoding_error
            .as_deref()
            .map(|e| self.sanitizer.sanitize(Some(e)));

        Ok(TranscodingStatusResponse {
            needs_operator_review: item.needs_operator_review(self.config.review_threshold),
            media_id: item.id,
            status: item.status,
            media_type: item.media_type,
            transcoding_attempts: item.transcoding_attempts,
            transcoding_error,
            ready_variants: item.ready_variants,
            hls_master_playlist_key: item.hls_master_playlist_key,
            duration_seconds: item.duration_seconds,
            mezzanine_status: item.mezzanine_status,
        })
    }

    async fn load_authorized(
        &self,
        media_id: &str,
        requester: &Requester,
    ) -> Result<MediaItem, AppError> {
        let item = self
            .store
            .get(media_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media item {} not found", media_id)))?;

        if !requester.may_access(&item) {
            return Err(AppError::Forbidden(
                "Requester does not own this media item".to_string(),
            ));
        }
        Ok(item)
    }

    fn build_job_input(&self, item: &MediaItem) -> Result<TranscodingJobInput, AppError> {
        let input_key = item
            .r2_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::InvalidState("Media item input not uploaded".to_string()))?;
        if !keys::validate(input_key) {
            return Err(AppError::Validation(
                "Media item input key is malformed".to_string(),
            ));
        }

        Ok(TranscodingJobInput {
            media_id: item.id.clone(),
            creator_id: item.creator_id.clone(),
            media_type: item.media_type,
            input_key: input_key.to_string(),
            webhook_url: self.config.webhook_url.clone(),
            priority: item.transcoding_priority,
            outputs: job_output_keys(item)?,
        })
    }

    /// Shared submission path of trigger and retry.
    async fn submit_and_record(
        &self,
        item: &MediaItem,
        expected: MediaStatus,
    ) -> Result<MediaItem, AppError> {
        let input = self.build_job_input(item)?;

        let job = self.job_client.submit(&input).await.map_err(|e| {
            tracing::warn!(error = %e, "Transcoding job submission failed");
            AppError::from(e)
        })?;

        let mezzanine_status = match item.media_type {
            MediaType::Video => Some(MezzanineStatus::Pending),
            MediaType::Audio => None,
        };

        match self
            .store
            .begin_transcoding(&item.id, expected, &job.job_id, mezzanine_status)
            .await?
        {
            Some(updated) => Ok(updated),
            None => {
                tracing::warn!(
                    orphaned_job_id = %job.job_id,
                    "Media item changed state during submission; job will be ignored"
                );
                Err(AppError::InvalidState(format!(
                    "Media item must be in '{}' state; it changed while the job was being submitted",
                    expected
                )))
            }
        }
    }

    fn job_response(&self, item: &MediaItem) -> TranscodingJobResponse {
        TranscodingJobResponse {
            accepted: true,
            media_id: item.id.clone(),
            job_id: item.runpod_job_id.clone().unwrap_or_default(),
            status: item.status,
            transcoding_attempts: item.transcoding_attempts,
            needs_operator_review: item.needs_operator_review(self.config.review_threshold),
        }
    }
}
