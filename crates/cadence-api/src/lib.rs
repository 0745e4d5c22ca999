//! Cadence API Library
//!
//! HTTP surface of the transcoding orchestrator: internal trigger, retry and
//! status endpoints, the job service webhook, and application setup.

pub mod api_doc;
pub mod auth;
pub mod constants;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
