//! Route paths and service identity.

pub const SERVICE_NAME: &str = "cadence-api";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const INTERNAL_PREFIX: &str = "/internal/transcoding";
pub const WEBHOOK_PATH: &str = "/webhooks/runpod";
pub const HEALTH_PATH: &str = "/health";
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Upper bound on the health probe's database round trip.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Server-level cap on in-flight requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 1024;
