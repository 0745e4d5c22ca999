//! Cadence Core Library
//!
//! Domain models, error types, configuration and constants shared by all
//! Cadence transcoding crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
