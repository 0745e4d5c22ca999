//! Route configuration and setup

use crate::api_doc::ApiDoc;
use crate::constants::{
    HEALTH_PATH, INTERNAL_PREFIX, MAX_CONCURRENT_REQUESTS, OPENAPI_PATH, WEBHOOK_PATH,
};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::Request,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use cadence_core::Config;
use cadence_infra::{get_request_id, request_id_middleware};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %get_request_id(request).unwrap_or_default(),
        )
    });

    let app = api_routes()
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(RequestBodyLimitLayer::new(config.max_request_body_bytes))
        .layer(cors)
        .layer(trace_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/trigger", INTERNAL_PREFIX),
            post(handlers::transcoding::trigger_transcoding),
        )
        .route(
            &format!("{}/retry", INTERNAL_PREFIX),
            post(handlers::transcoding::retry_transcoding),
        )
        .route(
            &format!("{}/{{media_id}}/status", INTERNAL_PREFIX),
            get(handlers::transcoding::transcoding_status),
        )
        .route(WEBHOOK_PATH, post(handlers::webhooks::runpod_webhook))
        .route(HEALTH_PATH, get(handlers::health::health_check))
        .route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}

/// Setup CORS configuration. Callers are backend services, so this mostly
/// matters for the docs endpoint.
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
