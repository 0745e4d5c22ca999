//! Constants shared by the transcoding core.

/// Upper bound on a stored `transcoding_error`.
pub const TRANSCODING_ERROR_MAX_LEN: usize = 500;

/// Stored when the worker reports a failure without a usable message.
pub const DEFAULT_TRANSCODING_ERROR: &str = "Transcoding failed";

/// Stored when a completed job reports keys outside the media item's namespace.
pub const INVALID_OUTPUT_ERROR: &str = "Transcoding output failed validation";

/// Internal worker-to-worker signature headers.
pub const INTERNAL_SIGNATURE_HEADER: &str = "x-cadence-signature";
pub const INTERNAL_TIMESTAMP_HEADER: &str = "x-cadence-timestamp";

/// External job service callback signature headers.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-runpod-signature";
pub const WEBHOOK_TIMESTAMP_HEADER: &str = "x-runpod-timestamp";
