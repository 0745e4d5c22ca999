//! Application state shared by all handlers.

use cadence_services::{SignatureVerifier, TranscodingService};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub transcoding: TranscodingService,
    /// Verifies signatures on the `/internal` routes.
    pub internal_verifier: SignatureVerifier,
    /// `None` when running against a non-Postgres store (tests).
    pub pool: Option<PgPool>,
}
