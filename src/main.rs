use chart_client::{
    FetchClient, HttpFetchClient, HttpFetchClientConfig, ResponseCache, RevalidationPolicy,
};
use chart_core::{base_url_from_env_value, load_config_file, EncounterTypeService};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the chart resource runner
///
/// Loads the startup configuration, resolves the configured excluded
/// encounter types against the server and prints one row per resolved type.
///
/// # Environment Variables
/// - `CHART_CONFIG`: Path to the YAML configuration file (default: "chart.yaml")
/// - `CHART_BASE_URL`: Server base URL used when no configuration file exists
///   (default: "http://localhost:8080/openmrs")
///
/// # Returns
/// * `Ok(())` - If resolution completes, even when individual fetches fail
/// * `Err(anyhow::Error)` - If configuration or client setup fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chart=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("CHART_CONFIG").unwrap_or_else(|_| "chart.yaml".into());

    let (base_url, excluded, policy) = if Path::new(&config_path).is_file() {
        tracing::info!("++ Loading chart configuration from {}", config_path);
        let config = load_config_file(Path::new(&config_path))?;
        (
            config.base_url().to_string(),
            config.excluded_encounter_types().to_vec(),
            config.policy().clone(),
        )
    } else {
        let defaults = HttpFetchClientConfig::default();
        let base_url =
            base_url_from_env_value(std::env::var("CHART_BASE_URL").ok(), &defaults.base_url);
        (base_url, Vec::new(), RevalidationPolicy::default())
    };

    tracing::info!("++ Starting chart resolution against {}", base_url);

    let client = Arc::new(HttpFetchClient::new(HttpFetchClientConfig {
        base_url,
        ..HttpFetchClientConfig::default()
    })?) as Arc<dyn FetchClient>;
    let cache = Arc::new(ResponseCache::new(policy));

    let service = EncounterTypeService::new(client, cache);
    service.set_excluded_uuids(excluded).await;
    let view = service.settled().await;

    if let Some(error) = view.error() {
        tracing::warn!("Some encounter types failed to resolve: {}", error);
    }

    match view.data() {
        Some(types) if !types.is_empty() => {
            for encounter_type in types {
                println!("{}  {}", encounter_type.uuid, encounter_type.display);
            }
        }
        _ => println!("No excluded encounter types configured."),
    }

    Ok(())
}
