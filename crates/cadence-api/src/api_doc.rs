//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use cadence_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cadence Transcoding API",
        version = "0.1.0",
        description = "Internal orchestration API for media transcoding. Internal routes are signed with the internal HMAC secret; the webhook is signed by the job service."
    ),
    paths(
        handlers::transcoding::trigger_transcoding,
        handlers::transcoding::retry_transcoding,
        handlers::transcoding::transcoding_status,
        handlers::webhooks::runpod_webhook,
        handlers::health::health_check,
    ),
    components(schemas(
        models::TranscodingRequest,
        models::TranscodingJobResponse,
        models::TranscodingStatusResponse,
        models::WebhookAck,
        models::WebhookOutcome,
        models::MediaStatus,
        models::MediaType,
        models::MezzanineStatus,
        handlers::health::HealthCheckResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "transcoding", description = "Trigger, retry and inspect transcoding jobs"),
        (name = "webhooks", description = "Job service callbacks"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
