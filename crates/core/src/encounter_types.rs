//! Encounter type resolution.
//!
//! Chart timelines hide encounters whose type is configured as excluded. The
//! exclusions arrive as bare identifiers, so this module resolves them into
//! named metadata the filters can present.

use crate::constants::{ENCOUNTER_TYPE_RESOURCE, REST_API_ROOT};
use crate::resolver::{decode_resources, ResourceResolver, ResourceView};
use chart_client::{
    FetchClient, FetchError, FetchResponse, Representation, RequestDescriptor, ResponseCache,
};
use chart_types::EncounterType;
use chart_uuid::ResourceUuid;
use std::sync::Arc;
use tokio::sync::watch;

/// Builds the GET request for one encounter type's full representation.
pub(crate) fn encounter_type_request(uuid: &ResourceUuid) -> RequestDescriptor {
    RequestDescriptor::new(format!("{REST_API_ROOT}/{ENCOUNTER_TYPE_RESOURCE}/{uuid}"))
        .with_representation(Representation::Full)
}

fn project_encounter_types(response: &FetchResponse) -> Result<Vec<EncounterType>, FetchError> {
    Ok(decode_resources(response)?
        .iter()
        .filter_map(EncounterType::from_resource)
        .collect())
}

/// Resolves the configured encounter type exclusions into display metadata.
pub struct EncounterTypeService {
    resolver: ResourceResolver<EncounterType>,
}

impl EncounterTypeService {
    pub fn new(client: Arc<dyn FetchClient>, cache: Arc<ResponseCache>) -> Self {
        Self {
            resolver: ResourceResolver::new(
                client,
                cache,
                encounter_type_request,
                project_encounter_types,
            ),
        }
    }

    /// Replaces the excluded encounter type list and fetches its metadata.
    ///
    /// An empty list settles idle without issuing any request.
    pub async fn set_excluded_uuids(&self, uuids: Vec<ResourceUuid>) {
        self.resolver.set_identifiers(uuids).await;
    }

    /// Current snapshot of the excluded encounter types, in configured order.
    pub fn excluded(&self) -> ResourceView<EncounterType> {
        self.resolver.view()
    }

    /// Waits for every planned fetch to settle.
    pub async fn settled(&self) -> ResourceView<EncounterType> {
        self.resolver.settled().await
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<ResourceView<EncounterType>> {
        self.resolver.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ResourceStatus;
    use chart_client::{MockFetchClient, StatusCode};
    use serde_json::json;

    #[test]
    fn test_request_targets_the_encounter_type_resource() {
        let uuid = ResourceUuid::new();
        let request = encounter_type_request(&uuid);
        assert_eq!(
            request.relative_url(),
            format!("/ws/rest/v1/encountertype/{uuid}?v=full")
        );
    }

    #[test]
    fn test_projection_accepts_object_and_list_bodies() {
        let single = FetchResponse::new(
            StatusCode::OK,
            json!({"uuid": "u1", "display": "Vitals"}),
        );
        let types = project_encounter_types(&single).unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].display.as_str(), "Vitals");

        let listed = FetchResponse::new(
            StatusCode::OK,
            json!([
                {"uuid": "u1", "display": "Vitals"},
                {"uuid": "u2", "display": "Admission"}
            ]),
        );
        let types = project_encounter_types(&listed).unwrap();
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn test_projection_drops_unnamed_resources() {
        let response = FetchResponse::new(
            StatusCode::OK,
            json!([
                {"uuid": "u1", "display": "Vitals"},
                {"uuid": "u2", "display": ""},
                {"uuid": "u3"}
            ]),
        );
        let types = project_encounter_types(&response).unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].uuid, "u1");
    }

    #[tokio::test]
    async fn test_service_resolves_exclusions_in_configured_order() {
        let mock = Arc::new(MockFetchClient::new());
        let cache = Arc::new(ResponseCache::default());
        let service =
            EncounterTypeService::new(Arc::clone(&mock) as Arc<dyn FetchClient>, cache);

        let admission = ResourceUuid::new();
        let vitals = ResourceUuid::new();
        mock.script_json(
            &encounter_type_request(&admission),
            json!({"uuid": admission.to_string(), "display": "Admission"}),
        );
        mock.script_json(
            &encounter_type_request(&vitals),
            json!({"uuid": vitals.to_string(), "display": "Vitals"}),
        );

        service
            .set_excluded_uuids(vec![admission.clone(), vitals.clone()])
            .await;
        let view = service.settled().await;

        assert_eq!(view.status(), ResourceStatus::Ready);
        let displays: Vec<&str> = view
            .data()
            .unwrap()
            .iter()
            .map(|encounter_type| encounter_type.display.as_str())
            .collect();
        assert_eq!(displays, vec!["Admission", "Vitals"]);
    }

    #[tokio::test]
    async fn test_service_settles_idle_for_no_exclusions() {
        let mock = Arc::new(MockFetchClient::new());
        let cache = Arc::new(ResponseCache::default());
        let service =
            EncounterTypeService::new(Arc::clone(&mock) as Arc<dyn FetchClient>, cache);

        service.set_excluded_uuids(Vec::new()).await;
        let view = service.settled().await;

        assert_eq!(view.status(), ResourceStatus::Idle);
        assert_eq!(view.data(), Some(&[][..]));
        assert_eq!(mock.total_calls(), 0);
    }
}
