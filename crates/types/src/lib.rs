//! Shared value types for the chart resource layer.
//!
//! These types model the REST envelope bodies an OpenMRS-compatible server
//! returns and the validated projections the aggregation stage derives from
//! them. Everything here is plain data; no I/O.

use serde::{Deserialize, Serialize};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A display label that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
///
/// REST resources regularly arrive with `display` set to an empty string while
/// the server is still resolving names. Converting to `DisplayText` is the
/// point where "has a usable label" becomes a type-level guarantee for
/// everything downstream of the filter stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayText(String);

impl DisplayText {
    /// Creates a new `DisplayText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(DisplayText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DisplayText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for DisplayText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DisplayText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DisplayText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Keyed access to a resource's server-side uuid.
///
/// The aggregation stage uses this to deduplicate merged output while
/// preserving first-occurrence order.
pub trait Identified {
    fn uuid(&self) -> &str;
}

/// Raw REST resource envelope body.
///
/// Every resource representation carries a `uuid` and a human-readable
/// `display`; the remaining representation-dependent fields are preserved
/// as-is under `extra`. `display` stays optional here on purpose: deciding
/// what to do with an entry that has no usable label belongs to the filter
/// stage, not to deserialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestResource {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub retired: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Identified for RestResource {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

/// An encounter type with a usable display label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterType {
    pub uuid: String,
    pub display: DisplayText,
    pub description: Option<String>,
    pub retired: bool,
}

impl EncounterType {
    /// Projects a raw envelope body into an encounter type.
    ///
    /// Returns `None` when the resource has no usable display label yet. Such
    /// entries are skipped by the aggregation stage rather than treated as
    /// errors.
    pub fn from_resource(resource: &RestResource) -> Option<Self> {
        let display = DisplayText::new(resource.display.as_deref()?).ok()?;
        Some(Self {
            uuid: resource.uuid.clone(),
            display,
            description: resource.description.clone(),
            retired: resource.retired,
        })
    }
}

impl Identified for EncounterType {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

/// A concept with its display label and measurement units, as consumed by the
/// vitals and biometrics columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Concept {
    pub uuid: String,
    pub display: DisplayText,
    pub units: Option<String>,
}

impl Concept {
    /// Projects a raw envelope body into a concept.
    ///
    /// Follows the same label rule as [`EncounterType::from_resource`]; a
    /// blank `units` field maps to `None`.
    pub fn from_resource(resource: &RestResource) -> Option<Self> {
        let display = DisplayText::new(resource.display.as_deref()?).ok()?;
        let units = resource
            .extra
            .get("units")
            .and_then(|value| value.as_str())
            .map(str::trim)
            .filter(|units| !units.is_empty())
            .map(str::to_owned);
        Some(Self {
            uuid: resource.uuid.clone(),
            display,
            units,
        })
    }
}

impl Identified for Concept {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}
