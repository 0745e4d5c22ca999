//! Service wiring

use anyhow::Result;
use cadence_core::Config;
use cadence_db::MediaItemRepository;
use cadence_services::{
    RunpodClient, RunpodClientConfig, SignatureVerifier, TranscodingService,
    TranscodingServiceConfig,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// Build the transcoding service and its collaborators from config.
pub fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let store = Arc::new(MediaItemRepository::new(pool.clone()));

    let job_client = Arc::new(RunpodClient::new(RunpodClientConfig {
        api_base_url: config.runpod_api_base_url.clone(),
        endpoint_id: config.runpod_endpoint_id.clone(),
        api_key: config.runpod_api_key.clone(),
        timeout: Duration::from_secs(config.runpod_submit_timeout_secs),
    })?);
    if config.runpod_endpoint_id.is_none() || config.runpod_api_key.is_none() {
        tracing::warn!("RunPod credentials not configured; transcoding submissions will fail");
    }

    let webhook_verifier = SignatureVerifier::new(
        "webhook",
        config.runpod_webhook_secret.clone(),
        config.signature_max_skew_secs,
    );
    let internal_verifier = SignatureVerifier::new(
        "internal",
        config.internal_signing_secret.clone(),
        config.signature_max_skew_secs,
    );
    if !webhook_verifier.is_configured() {
        tracing::warn!("RUNPOD_WEBHOOK_SECRET not set; all webhooks will be rejected");
    }
    if !internal_verifier.is_configured() {
        tracing::warn!("INTERNAL_SIGNING_SECRET not set; all internal calls will be rejected");
    }

    let transcoding = TranscodingService::new(
        store,
        job_client,
        webhook_verifier,
        TranscodingServiceConfig {
            webhook_url: config.webhook_url(),
            review_threshold: config.transcoding_review_threshold,
        },
    )?;

    tracing::info!(
        webhook_url = %config.webhook_url(),
        review_threshold = config.transcoding_review_threshold,
        "Transcoding service initialized"
    );

    Ok(Arc::new(AppState {
        transcoding,
        internal_verifier,
        pool: Some(pool),
    }))
}
