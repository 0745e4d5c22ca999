use cadence_core::constants::INVALID_OUTPUT_ERROR;
use cadence_core::models::{MediaStatus, WebhookJobStatus, WebhookOutcome, WebhookPayload};
use cadence_core::AppError;

use super::outputs::accept_outputs;
use super::TranscodingService;

impl TranscodingService {
    /// Apply a job service callback.
    ///
    /// Returns `Err(Unauthorized)` only when the signature check fails; in that
    /// case nothing is read or written. Everything after authentication is
    /// acknowledged with an outcome, including internal failures, so the
    /// caller never resends a delivery that was already seen.
    #[tracing::instrument(skip_all)]
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, AppError> {
        self.webhook_verifier.verify(body, timestamp, signature)?;

        let outcome = match self.process_webhook(body).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    error = %e.detailed_message(),
                    "Webhook processing failed; acknowledging delivery"
                );
                WebhookOutcome::Errored
            }
        };

        tracing::info!(outcome = outcome.as_str(), "Webhook processed");
        Ok(outcome)
    }

    async fn process_webhook(&self, body: &[u8]) -> Result<WebhookOutcome, AppError> {
        let payload: WebhookPayload = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable webhook payload");
                return Ok(WebhookOutcome::Rejected);
            }
        };

        let Some(job_id) = payload.job_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            tracing::warn!("Webhook payload is missing jobId");
            return Ok(WebhookOutcome::Rejected);
        };
        let Some(status) = payload.status else {
            tracing::warn!(job_id = %job_id, "Webhook payload is missing status");
            return Ok(WebhookOutcome::Rejected);
        };

        let item = match payload.media_id() {
            Some(media_id) => self.store.get(media_id).await?,
            None => self.store.find_by_job_id(job_id).await?,
        };
        let Some(item) = item else {
            tracing::info!(job_id = %job_id, media_id = ?payload.media_id(), "Webhook for unknown media item");
            return Ok(WebhookOutcome::Orphaned);
        };

        if item.runpod_job_id.as_deref() != Some(job_id) {
            tracing::info!(
                media_id = %item.id,
                job_id = %job_id,
                current_job_id = ?item.runpod_job_id,
                "Ignoring webhook for superseded job"
            );
            return Ok(WebhookOutcome::Stale);
        }

        if item.status != MediaStatus::Transcoding {
            tracing::debug!(
                media_id = %item.id,
                job_id = %job_id,
                status = %item.status,
                "Ignoring duplicate webhook"
            );
            return Ok(WebhookOutcome::Duplicate);
        }

        let updated = match status {
            WebhookJobStatus::Completed => match accept_outputs(&item, payload.result()) {
                Ok(outputs) => {
                    self.store
                        .complete_transcoding(&item.id, job_id, &outputs)
                        .await?
                }
                Err(reason) => {
                    tracing::warn!(
                        media_id = %item.id,
                        job_id = %job_id,
                        reason = %reason,
                        "Rejecting transcoding outputs"
                    );
                    self.store
                        .fail_transcoding(&item.id, job_id, INVALID_OUTPUT_ERROR)
                        .await?
                }
            },
            WebhookJobStatus::Failed => {
                let message = self.sanitizer.sanitize(payload.error_message());
                self.store
                    .fail_transcoding(&item.id, job_id, &message)
                    .await?
            }
        };

        match updated {
            Some(item) => {
                tracing::info!(
                    media_id = %item.id,
                    job_id = %job_id,
                    status = %item.status,
                    "Transcoding finished"
                );
                Ok(WebhookOutcome::Applied)
            }
            None => {
                tracing::debug!(job_id = %job_id, "Concurrent webhook already applied");
                Ok(WebhookOutcome::Duplicate)
            }
        }
    }
}
