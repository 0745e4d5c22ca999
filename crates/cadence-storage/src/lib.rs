//! Cadence Storage Library
//!
//! Object-storage key management for transcoding inputs and outputs.
//!
//! # Storage key format
//!
//! Every key is owner-scoped and has at least four segments:
//!
//! - `{creator_id}/{folder}/{media_id}/{filename...}`
//!
//! Originals and streaming outputs live in R2, the archival mezzanine encode in
//! B2. Keys must not contain `..`, backslashes, null bytes or a leading `/`, in
//! raw or percent-encoded form. Key generation is centralized in [`keys`] so the
//! orchestrator and the worker contract stay consistent.

pub mod keys;

pub use keys::{derive, parse, validate, KeyError, KeyKind, ParsedKey};
