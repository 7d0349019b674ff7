//! Resource identifier utilities.
//!
//! Chart requests address server-side resources by UUID inside URL paths, for
//! example `/ws/rest/v1/encountertype/{uuid}`. The request URL doubles as the
//! response-cache key, so the same resource must never be addressable through
//! two spellings of its identifier, and a malformed identifier must never
//! reach a URL at all.
//!
//! To that end, externally supplied identifiers are validated into a
//! *canonical* representation up front: **lowercase, hyphenated RFC 4122
//! form**.
//!
//! ## Canonical identifier form
//! - Length: 36
//! - Characters: `0-9`, `a-f` and `-` only
//! - Hyphens at positions 8, 13, 18 and 23
//! - Example: `550e8400-e29b-41d4-a716-446655440000`
//!
//! Notes:
//! - This is the form an OpenMRS-compatible server hands out for resource
//!   uuids, so round-tripping an identifier through the server is lossless.
//! - Canonical form is *required* for externally supplied identifiers (for
//!   example, from CLI or config inputs). Use [`ResourceUuid::parse`] to
//!   validate an input string.
//! - Non-canonical values (uppercase, unhyphenated, wrong length, non-hex) are
//!   rejected rather than normalised.

mod service;

// Re-export public types
pub use service::{ResourceUuid, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
