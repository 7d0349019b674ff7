use chart_client::{
    CancellationToken, FetchClient, FetchError, HttpFetchClient, HttpFetchClientConfig,
    ResponseCache,
};
use chart_core::{
    base_url_from_env_value, delete_encounter, ConceptUnitsService, EncounterTypeService,
};
use chart_uuid::ResourceUuid;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chart")]
#[command(about = "Patient chart resource CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve excluded encounter types into display metadata
    ExcludedTypes {
        /// Encounter type UUIDs, in the order they should appear
        uuids: Vec<String>,
        /// Server base URL (overrides CHART_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Resolve concept unit labels
    ConceptUnits {
        /// Concept UUIDs, in the order they should appear
        uuids: Vec<String>,
        /// Server base URL (overrides CHART_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Delete an encounter (Ctrl-C cancels)
    DeleteEncounter {
        /// Encounter UUID
        uuid: String,
        /// Server base URL (overrides CHART_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn parse_uuids(raw: &[String]) -> Result<Vec<ResourceUuid>, chart_uuid::UuidError> {
    raw.iter().map(|value| value.parse()).collect()
}

fn http_client(base_url: Option<String>) -> Result<HttpFetchClient, FetchError> {
    let defaults = HttpFetchClientConfig::default();
    let base_url = base_url_from_env_value(
        base_url.or_else(|| std::env::var("CHART_BASE_URL").ok()),
        &defaults.base_url,
    );
    HttpFetchClient::new(HttpFetchClientConfig {
        base_url,
        ..defaults
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::ExcludedTypes { uuids, base_url }) => {
            let ids = parse_uuids(&uuids)?;
            let client = Arc::new(http_client(base_url)?) as Arc<dyn FetchClient>;
            let cache = Arc::new(ResponseCache::default());

            let service = EncounterTypeService::new(client, cache);
            service.set_excluded_uuids(ids).await;
            let view = service.settled().await;

            if let Some(error) = view.error() {
                eprintln!("Error resolving encounter types: {}", error);
            }
            match view.data() {
                Some(types) if !types.is_empty() => {
                    for encounter_type in types {
                        println!("{}  {}", encounter_type.uuid, encounter_type.display);
                    }
                }
                _ => println!("No encounter types resolved."),
            }
        }
        Some(Commands::ConceptUnits { uuids, base_url }) => {
            let ids = parse_uuids(&uuids)?;
            let client = Arc::new(http_client(base_url)?) as Arc<dyn FetchClient>;
            let cache = Arc::new(ResponseCache::default());

            let service = ConceptUnitsService::new(client, cache);
            service.set_concept_uuids(ids).await;
            let view = service.settled().await;

            if let Some(error) = view.error() {
                eprintln!("Error resolving concepts: {}", error);
            }
            match view.data() {
                Some(concepts) if !concepts.is_empty() => {
                    for concept in concepts {
                        match &concept.units {
                            Some(units) => {
                                println!("{}  {} ({})", concept.uuid, concept.display, units)
                            }
                            None => println!("{}  {}", concept.uuid, concept.display),
                        }
                    }
                }
                _ => println!("No concepts resolved."),
            }
        }
        Some(Commands::DeleteEncounter { uuid, base_url }) => {
            let encounter_uuid: ResourceUuid = uuid.parse()?;
            let client = http_client(base_url)?;

            let token = CancellationToken::new();
            let interrupt = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    interrupt.cancel();
                }
            });

            match delete_encounter(&client, &encounter_uuid, &token).await {
                Ok(_) => println!("Deleted encounter {}", encounter_uuid),
                Err(error) if error.is_cancelled() => println!("Cancelled."),
                Err(error) => eprintln!("Error deleting encounter: {}", error),
            }
        }
        None => {
            println!("Use 'chart --help' for commands");
        }
    }

    Ok(())
}
