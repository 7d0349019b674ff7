//! Concept unit resolution.
//!
//! Biometrics columns annotate their values with the unit declared on the
//! backing concept (weight in kg, height in cm and so on). This module
//! resolves configured concept identifiers into those unit labels, asking the
//! server for a narrow projection rather than the whole concept.

use crate::constants::{CONCEPT_RESOURCE, CONCEPT_UNITS_PROJECTION, REST_API_ROOT};
use crate::resolver::{decode_resources, ResourceResolver, ResourceView};
use chart_client::{
    FetchClient, FetchError, FetchResponse, Representation, RequestDescriptor, ResponseCache,
};
use chart_types::Concept;
use chart_uuid::ResourceUuid;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Builds the GET request for one concept's units projection.
pub(crate) fn concept_request(uuid: &ResourceUuid) -> RequestDescriptor {
    RequestDescriptor::new(format!("{REST_API_ROOT}/{CONCEPT_RESOURCE}/{uuid}"))
        .with_representation(Representation::Custom(CONCEPT_UNITS_PROJECTION.to_string()))
}

fn project_concepts(response: &FetchResponse) -> Result<Vec<Concept>, FetchError> {
    Ok(decode_resources(response)?
        .iter()
        .filter_map(Concept::from_resource)
        .collect())
}

/// Resolves configured concept identifiers into unit labels.
pub struct ConceptUnitsService {
    resolver: ResourceResolver<Concept>,
}

impl ConceptUnitsService {
    pub fn new(client: Arc<dyn FetchClient>, cache: Arc<ResponseCache>) -> Self {
        Self {
            resolver: ResourceResolver::new(client, cache, concept_request, project_concepts),
        }
    }

    /// Replaces the concept list and fetches unit metadata for each entry.
    pub async fn set_concept_uuids(&self, uuids: Vec<ResourceUuid>) {
        self.resolver.set_identifiers(uuids).await;
    }

    /// Current snapshot of the resolved concepts, in configured order.
    pub fn view(&self) -> ResourceView<Concept> {
        self.resolver.view()
    }

    /// Waits for every planned fetch to settle.
    pub async fn settled(&self) -> ResourceView<Concept> {
        self.resolver.settled().await
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<ResourceView<Concept>> {
        self.resolver.subscribe()
    }

    /// Unit labels keyed by concept identifier, for concepts declaring one.
    pub fn units(&self) -> HashMap<String, String> {
        self.view()
            .data()
            .unwrap_or_default()
            .iter()
            .filter_map(|concept| {
                concept
                    .units
                    .clone()
                    .map(|units| (concept.uuid.clone(), units))
            })
            .collect()
    }

    /// Unit label for one concept, if it resolved and declares a unit.
    pub fn unit_for(&self, uuid: &ResourceUuid) -> Option<String> {
        let key = uuid.to_string();
        self.view()
            .data()
            .unwrap_or_default()
            .iter()
            .find(|concept| concept.uuid == key)
            .and_then(|concept| concept.units.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ResourceStatus;
    use chart_client::MockFetchClient;
    use serde_json::json;

    #[test]
    fn test_request_uses_the_units_projection() {
        let uuid = ResourceUuid::new();
        let request = concept_request(&uuid);
        assert_eq!(
            request.relative_url(),
            format!("/ws/rest/v1/concept/{uuid}?v=custom:(uuid,display,units)")
        );
    }

    #[tokio::test]
    async fn test_units_map_skips_concepts_without_units() {
        let mock = Arc::new(MockFetchClient::new());
        let cache = Arc::new(ResponseCache::default());
        let service = ConceptUnitsService::new(Arc::clone(&mock) as Arc<dyn FetchClient>, cache);

        let weight = ResourceUuid::new();
        let pulse = ResourceUuid::new();
        mock.script_json(
            &concept_request(&weight),
            json!({"uuid": weight.to_string(), "display": "Weight", "units": "kg"}),
        );
        mock.script_json(
            &concept_request(&pulse),
            json!({"uuid": pulse.to_string(), "display": "Pulse"}),
        );

        service
            .set_concept_uuids(vec![weight.clone(), pulse.clone()])
            .await;
        let view = service.settled().await;
        assert_eq!(view.status(), ResourceStatus::Ready);

        let units = service.units();
        assert_eq!(units.len(), 1);
        assert_eq!(units.get(&weight.to_string()).map(String::as_str), Some("kg"));

        assert_eq!(service.unit_for(&weight).as_deref(), Some("kg"));
        assert_eq!(service.unit_for(&pulse), None);
    }

    #[tokio::test]
    async fn test_blank_units_are_treated_as_absent() {
        let mock = Arc::new(MockFetchClient::new());
        let cache = Arc::new(ResponseCache::default());
        let service = ConceptUnitsService::new(Arc::clone(&mock) as Arc<dyn FetchClient>, cache);

        let muac = ResourceUuid::new();
        mock.script_json(
            &concept_request(&muac),
            json!({"uuid": muac.to_string(), "display": "MUAC", "units": "  "}),
        );

        service.set_concept_uuids(vec![muac.clone()]).await;
        service.settled().await;

        assert_eq!(service.unit_for(&muac), None);
        assert!(service.units().is_empty());
    }
}
