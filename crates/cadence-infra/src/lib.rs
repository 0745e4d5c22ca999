//! Cadence Infrastructure Library
//!
//! Shared plumbing for the HTTP service: tracing setup and request-scoped
//! middleware.

pub mod middleware;
pub mod telemetry;

pub use middleware::{get_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use telemetry::{init_telemetry, LogFormat};
