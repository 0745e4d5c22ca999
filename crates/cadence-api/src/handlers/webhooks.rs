use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use cadence_core::constants::{WEBHOOK_SIGNATURE_HEADER, WEBHOOK_TIMESTAMP_HEADER};
use cadence_core::models::WebhookAck;

use crate::auth::header_str;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Completion callback from the job service.
///
/// Anything that passes the signature check is acknowledged with 200 so the
/// sender does not redeliver; `outcome` says what happened to it.
#[utoipa::path(
    post,
    path = "/webhooks/runpod",
    tag = "webhooks",
    request_body(content = String, description = "Job result payload (nested `output` or flat)", content_type = "application/json"),
    params(
        ("X-Runpod-Timestamp" = String, Header, description = "Unix seconds used in the signature"),
        ("X-Runpod-Signature" = String, Header, description = "Hex HMAC-SHA256 of \"{timestamp}.{body}\"")
    ),
    responses(
        (status = 200, description = "Delivery received", body = WebhookAck),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse)
    )
)]
pub async fn runpod_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, HttpAppError> {
    let outcome = state
        .transcoding
        .handle_webhook(
            &body,
            header_str(&headers, WEBHOOK_TIMESTAMP_HEADER),
            header_str(&headers, WEBHOOK_SIGNATURE_HEADER),
        )
        .await?;

    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}
