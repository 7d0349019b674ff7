//! Internal implementation of the resource identifier wrapper.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// The canonical resource identifier representation (lowercase, hyphenated
/// RFC 4122 form).
///
/// This wrapper type guarantees that once constructed, the contained UUID is
/// in canonical form. It provides type safety for identifier handling and
/// keeps request-key derivation deterministic across the system.
///
/// # When to use this type
/// Use this wrapper whenever you are:
/// - Accepting a resource uuid from *outside* the core (CLI input, config
///   file, etc), or
/// - Building a request path that addresses a single resource.
///
/// Once you have a `ResourceUuid`, you can safely assume the internal UUID is
/// valid and in canonical form.
///
/// # Construction
/// - [`ResourceUuid::new`] generates a fresh canonical identifier (mostly
///   useful in tests and fixtures).
/// - [`ResourceUuid::parse`] validates an externally supplied identifier.
///
/// # Errors
/// [`ResourceUuid::parse`] returns [`UuidError::InvalidInput`] if the input is
/// not already canonical.
///
/// # Display format
/// When displayed or converted to string, `ResourceUuid` always produces the
/// canonical 36-character lowercase hyphenated format.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceUuid(Uuid);

impl ResourceUuid {
    /// Generates a new identifier in canonical form.
    ///
    /// The generated UUID follows RFC 4122 version 4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a uuid string that must already be in canonical
    /// form.
    ///
    /// This does **not** normalise other common UUID forms (for example,
    /// unhyphenated or uppercase). Callers must provide the canonical
    /// representation. Normalising here would let one resource appear under
    /// two request keys.
    ///
    /// # Arguments
    ///
    /// * `input` - Uuid string to validate and wrap. Must be exactly 36
    ///   lowercase hyphenated hex characters.
    ///
    /// # Returns
    ///
    /// Returns a validated [`ResourceUuid`] on success.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical
    /// form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if Self::is_canonical(input) {
            // SAFETY: is_canonical guarantees valid hex, so parse_str will succeed
            let uuid = Uuid::parse_str(input).expect("is_canonical guarantees valid UUID");
            return Ok(Self(uuid));
        }
        Err(UuidError::InvalidInput(format!(
            "resource uuid must be 36 lowercase hyphenated hex characters, got: '{}'",
            input
        )))
    }

    /// Returns the identifier as a `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical resource uuid form.
    ///
    /// This is a purely syntactic check that validates:
    /// - Exactly 36 bytes long
    /// - Hyphens at positions 8, 13, 18 and 23
    /// - Lowercase hex characters (`0-9` and `a-f`) everywhere else
    ///
    /// # Arguments
    ///
    /// * `input` - Candidate uuid string to validate.
    ///
    /// # Returns
    ///
    /// Returns `true` if `input` is canonical, otherwise `false`.
    pub fn is_canonical(input: &str) -> bool {
        let bytes = input.as_bytes();
        if bytes.len() != 36 {
            return false;
        }
        bytes.iter().enumerate().all(|(index, byte)| match index {
            8 | 13 | 18 | 23 => *byte == b'-',
            _ => matches!(byte, b'0'..=b'9' | b'a'..=b'f'),
        })
    }
}

impl Default for ResourceUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceUuid {
    /// Formats the identifier in canonical form (lowercase, hyphenated).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ResourceUuid {
    type Err = UuidError;

    /// Parses a string into a `ResourceUuid`, requiring canonical form.
    ///
    /// This is equivalent to calling [`ResourceUuid::parse`].
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if the string is not in canonical
    /// form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceUuid::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ResourceUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ResourceUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}
