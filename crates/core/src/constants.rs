//! Constants used throughout the chart core crate.
//!
//! This module contains the REST path segments shared by every resource
//! service so the URL layout is defined in exactly one place.

/// Root of the REST web-service API, relative to the server base URL.
pub const REST_API_ROOT: &str = "/ws/rest/v1";

/// Resource segment for encounter type metadata.
pub const ENCOUNTER_TYPE_RESOURCE: &str = "encountertype";

/// Resource segment for encounters.
pub const ENCOUNTER_RESOURCE: &str = "encounter";

/// Resource segment for concept metadata.
pub const CONCEPT_RESOURCE: &str = "concept";

/// Projection requested for concept lookups; keeps responses to the fields
/// the units services read.
pub const CONCEPT_UNITS_PROJECTION: &str = "custom:(uuid,display,units)";
