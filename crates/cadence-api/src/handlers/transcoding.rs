//! Internal transcoding endpoints. Callers are other backend services; every
//! request is HMAC-signed with the internal secret over its method, target
//! and body.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, Method},
    Json,
};
use bytes::Bytes;
use cadence_core::models::{
    Requester, TranscodingJobResponse, TranscodingRequest, TranscodingStatusResponse,
};
use cadence_core::AppError;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::verify_internal;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    /// Creator on whose behalf the call is made. Omit for internal callers.
    pub requester_id: Option<String>,
}

/// Authenticate, then decode the signed body.
fn signed_request(
    state: &AppState,
    method: &Method,
    uri: &OriginalUri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(String, Requester), HttpAppError> {
    verify_internal(&state.internal_verifier, method, &uri.0, headers, body)?;

    let request: TranscodingRequest = serde_json::from_slice(body)?;
    let media_id = request.media_id.trim();
    if media_id.is_empty() {
        return Err(AppError::Validation("mediaId is required".to_string()).into());
    }
    Ok((
        media_id.to_string(),
        Requester::from_requester_id(request.requester_id),
    ))
}

#[utoipa::path(
    post,
    path = "/internal/transcoding/trigger",
    tag = "transcoding",
    request_body = TranscodingRequest,
    params(
        ("X-Cadence-Timestamp" = String, Header, description = "Unix seconds used in the signature"),
        ("X-Cadence-Signature" = String, Header, description = "Hex HMAC-SHA256 of \"{timestamp}.POST {path}.{body}\"")
    ),
    responses(
        (status = 200, description = "Job submitted and media item moved to transcoding", body = TranscodingJobResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 403, description = "Requester does not own the media item", body = ErrorResponse),
        (status = 404, description = "Media item not found", body = ErrorResponse),
        (status = 409, description = "Media item is not in the uploaded state", body = ErrorResponse),
        (status = 502, description = "Job service unavailable", body = ErrorResponse)
    )
)]
pub async fn trigger_transcoding(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TranscodingJobResponse>, HttpAppError> {
    let (media_id, requester) = signed_request(&state, &method, &uri, &headers, &body)?;
    let response = state.transcoding.trigger_job(&media_id, &requester).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/internal/transcoding/retry",
    tag = "transcoding",
    request_body = TranscodingRequest,
    params(
        ("X-Cadence-Timestamp" = String, Header, description = "Unix seconds used in the signature"),
        ("X-Cadence-Signature" = String, Header, description = "Hex HMAC-SHA256 of \"{timestamp}.POST {path}.{body}\"")
    ),
    responses(
        (status = 200, description = "Job resubmitted", body = TranscodingJobResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 403, description = "Requester does not own the media item", body = ErrorResponse),
        (status = 404, description = "Media item not found", body = ErrorResponse),
        (status = 409, description = "Media item is not in the failed state", body = ErrorResponse),
        (status = 502, description = "Job service unavailable", body = ErrorResponse)
    )
)]
pub async fn retry_transcoding(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TranscodingJobResponse>, HttpAppError> {
    let (media_id, requester) = signed_request(&state, &method, &uri, &headers, &body)?;
    let response = state.transcoding.retry_job(&media_id, &requester).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/internal/transcoding/{media_id}/status",
    tag = "transcoding",
    params(
        ("media_id" = String, Path, description = "Media item ID"),
        StatusQuery,
        ("X-Cadence-Timestamp" = String, Header, description = "Unix seconds used in the signature"),
        ("X-Cadence-Signature" = String, Header, description = "Hex HMAC-SHA256 of \"{timestamp}.GET {path_and_query}.\"")
    ),
    responses(
        (status = 200, description = "Current transcoding state", body = TranscodingStatusResponse),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 403, description = "Requester does not own the media item", body = ErrorResponse),
        (status = 404, description = "Media item not found", body = ErrorResponse)
    )
)]
pub async fn transcoding_status(
    State(state): State<Arc<AppState>>,
    Path(media_id): Path<String>,
    Query(query): Query<StatusQuery>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<TranscodingStatusResponse>, HttpAppError> {
    verify_internal(&state.internal_verifier, &method, &uri, &headers, b"")?;

    let requester = Requester::from_requester_id(query.requester_id);
    let response = state.transcoding.status(&media_id, &requester).await?;
    Ok(Json(response))
}
