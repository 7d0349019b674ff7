//! Encounter mutations.

use crate::constants::{ENCOUNTER_RESOURCE, REST_API_ROOT};
use chart_client::{CancellationToken, FetchClient, FetchResponse, FetchResult, RequestDescriptor};
use chart_uuid::ResourceUuid;

fn encounter_request(uuid: &ResourceUuid) -> RequestDescriptor {
    RequestDescriptor::new(format!("{REST_API_ROOT}/{ENCOUNTER_RESOURCE}/{uuid}"))
}

/// Deletes one encounter.
///
/// Cancelling `token` aborts the request and resolves to a cancellation
/// failure, which callers normally suppress rather than report. A successful
/// deletion is answered with `204 No Content`.
///
/// Deletion does not touch the response cache. Callers that list encounters
/// invalidate or refetch their own views once this settles.
///
/// # Errors
///
/// Returns [`chart_client::FetchError`] if the request fails, the server
/// rejects the deletion or `token` is cancelled.
pub async fn delete_encounter(
    client: &dyn FetchClient,
    encounter_uuid: &ResourceUuid,
    token: &CancellationToken,
) -> FetchResult<FetchResponse> {
    let request = encounter_request(encounter_uuid);
    tracing::info!(encounter = %encounter_uuid, "Deleting encounter");
    client.delete(&request, token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chart_client::{FetchError, MockFetchClient, StatusCode};

    #[test]
    fn test_request_targets_the_encounter_resource() {
        let uuid = ResourceUuid::new();
        let request = encounter_request(&uuid);
        assert_eq!(
            request.relative_url(),
            format!("/ws/rest/v1/encounter/{uuid}")
        );
    }

    #[tokio::test]
    async fn test_delete_resolves_on_no_content() {
        let mock = MockFetchClient::new();
        let uuid = ResourceUuid::new();
        mock.script_status(&encounter_request(&uuid), StatusCode::NO_CONTENT);

        let response = delete_encounter(&mock, &uuid, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(mock.calls_for(&encounter_request(&uuid)), 1);
    }

    #[tokio::test]
    async fn test_delete_reports_cancellation_without_sending() {
        let mock = MockFetchClient::new();
        let uuid = ResourceUuid::new();
        mock.script_status(&encounter_request(&uuid), StatusCode::NO_CONTENT);

        let token = CancellationToken::new();
        token.cancel();

        let error = delete_encounter(&mock, &uuid, &token).await.unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_surfaces_server_rejection() {
        let mock = MockFetchClient::new();
        let uuid = ResourceUuid::new();
        mock.script_status(&encounter_request(&uuid), StatusCode::INTERNAL_SERVER_ERROR);

        let error = delete_encounter(&mock, &uuid, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(!error.is_cancelled());
        match error {
            FetchError::Status { status, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
