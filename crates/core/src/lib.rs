//! # Chart Core
//!
//! Resource aggregation for the patient chart.
//!
//! This crate turns ordered lists of resource identifiers into published,
//! cache-backed views:
//! - Fetch planning and eager parallel resolution with input-order merging
//! - Encounter type and concept unit services built on one generic resolver
//! - Encounter deletion with caller-driven cancellation
//! - Startup configuration loaded from YAML
//!
//! **No transport concerns**: HTTP details live in `chart-client`; this crate
//! only consumes the [`chart_client::FetchClient`] seam.

pub mod aggregate;
pub mod concepts;
pub mod config;
pub mod constants;
pub mod encounter_types;
pub mod encounters;
mod error;
pub mod resolver;
pub mod sequencer;
pub mod status;

pub use concepts::ConceptUnitsService;
pub use config::{base_url_from_env_value, load_config_file, BiometricsConcepts, ChartConfig};
pub use encounter_types::EncounterTypeService;
pub use encounters::delete_encounter;
pub use error::{ChartError, ChartResult};
pub use resolver::{decode_resources, ProjectFn, ResourceResolver, ResourceView};
pub use sequencer::{FetchPlan, RouteFn};
pub use status::ResourceStatus;
