//! Cadence Services Library
//!
//! Business logic of the transcoding orchestrator: request signing, the
//! external job service client and the transcoding state machine.

pub mod runpod;
pub mod signature;
pub mod transcoding;

pub use runpod::{JobClientError, RunpodClient, RunpodClientConfig, SubmittedJob, TranscodingJobClient};
pub use signature::{canonical_request, sign, SignatureError, SignatureVerifier};
pub use transcoding::{ErrorSanitizer, TranscodingService, TranscodingServiceConfig};
