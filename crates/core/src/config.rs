//! Chart runtime configuration.
//!
//! This module defines configuration that should be resolved once at process
//! startup and then passed into chart services. The intent is to avoid
//! reading process-wide environment variables while requests are in flight,
//! which leads to inconsistent behaviour in multi-threaded runtimes and test
//! harnesses.

use crate::{ChartError, ChartResult};
use chart_client::RevalidationPolicy;
use chart_uuid::ResourceUuid;
use serde::Deserialize;
use std::path::Path;

/// Chart configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ChartConfig {
    base_url: String,
    excluded_encounter_types: Vec<ResourceUuid>,
    concepts: BiometricsConcepts,
    policy: RevalidationPolicy,
}

impl ChartConfig {
    /// Create a new `ChartConfig`.
    ///
    /// The base URL is trimmed and loses any trailing slash so request paths
    /// join cleanly.
    pub fn new(
        base_url: String,
        excluded_encounter_types: Vec<ResourceUuid>,
        concepts: BiometricsConcepts,
        policy: RevalidationPolicy,
    ) -> ChartResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ChartError::InvalidInput("base_url cannot be empty".into()));
        }

        Ok(Self {
            base_url,
            excluded_encounter_types,
            concepts,
            policy,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Encounter types hidden from chart timelines, in configured order.
    pub fn excluded_encounter_types(&self) -> &[ResourceUuid] {
        &self.excluded_encounter_types
    }

    pub fn concepts(&self) -> &BiometricsConcepts {
        &self.concepts
    }

    pub fn policy(&self) -> &RevalidationPolicy {
        &self.policy
    }
}

/// Concept identifiers for the biometrics the chart annotates with units.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BiometricsConcepts {
    #[serde(default)]
    pub weight_uuid: Option<ResourceUuid>,
    #[serde(default)]
    pub height_uuid: Option<ResourceUuid>,
    #[serde(default)]
    pub muac_uuid: Option<ResourceUuid>,
}

impl BiometricsConcepts {
    /// Configured concept identifiers in declaration order.
    pub fn uuids(&self) -> Vec<ResourceUuid> {
        [&self.weight_uuid, &self.height_uuid, &self.muac_uuid]
            .into_iter()
            .filter_map(|uuid| uuid.clone())
            .collect()
    }
}

/// On-disk configuration schema.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChartConfigFile {
    base_url: String,
    #[serde(default)]
    excluded_encounter_types: Vec<ResourceUuid>,
    #[serde(default)]
    concepts: BiometricsConcepts,
    #[serde(default)]
    revalidate_if_stale: bool,
    #[serde(default)]
    revalidate_on_focus: bool,
    #[serde(default)]
    revalidate_on_reconnect: bool,
    #[serde(default)]
    stale_after_seconds: Option<i64>,
}

/// Strictly parse chart configuration from a YAML file.
///
/// This uses `serde_path_to_error` to surface a best-effort "path" (e.g.
/// `excluded_encounter_types[0]`) to the failing field when the YAML does not
/// match the configuration schema.
///
/// # Errors
///
/// Returns [`ChartError`] if:
/// - the file cannot be read,
/// - the YAML does not match the configuration schema,
/// - any unknown keys are present (due to `#[serde(deny_unknown_fields)]`),
/// - the resulting configuration fails validation.
pub fn load_config_file(path: &Path) -> ChartResult<ChartConfig> {
    let text = std::fs::read_to_string(path).map_err(ChartError::ConfigRead)?;
    let deserializer = serde_yaml::Deserializer::from_str(&text);

    let file: ChartConfigFile = match serde_path_to_error::deserialize(deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() {
                "<root>"
            } else {
                path.as_str()
            };
            return Err(ChartError::ConfigSchema(format!("{path}: {source}")));
        }
    };

    let mut policy = RevalidationPolicy::new()
        .with_revalidate_if_stale(file.revalidate_if_stale)
        .with_revalidate_on_focus(file.revalidate_on_focus)
        .with_revalidate_on_reconnect(file.revalidate_on_reconnect);
    if let Some(seconds) = file.stale_after_seconds {
        policy = policy.with_stale_after(chrono::Duration::seconds(seconds));
    }

    ChartConfig::new(
        file.base_url,
        file.excluded_encounter_types,
        file.concepts,
        policy,
    )
}

/// Resolve the server base URL from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn base_url_from_env_value(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
