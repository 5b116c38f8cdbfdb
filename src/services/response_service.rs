//! Participant responses.

use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::ResponseEntity, error::ServiceError, services::sse_events, state::SharedState,
};

/// Record a trimmed response for `session_id` and notify live views of the session.
pub async fn add_response(
    state: &SharedState,
    session_id: Uuid,
    text: &str,
) -> Result<ResponseEntity, ServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::InvalidInput(
            "please type a valid response".into(),
        ));
    }

    let response = state
        .store()
        .insert_response(session_id, text.to_string())
        .await
        .map_err(|err| {
            warn!(%session_id, error = %err, "failed to record response");
            ServiceError::from(err)
        })?;

    sse_events::broadcast_response_recorded(state, &response);
    Ok(response)
}

/// Response texts of `session_id`, newest first. Blank rows are skipped.
pub async fn get_responses(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Vec<String>, ServiceError> {
    let rows = state
        .store()
        .list_responses(session_id)
        .await
        .map_err(|err| {
            warn!(%session_id, error = %err, "failed to list responses");
            ServiceError::from(err)
        })?;

    Ok(rows
        .into_iter()
        .map(|row| row.response)
        .filter(|text| !text.trim().is_empty())
        .collect())
}

#[cfg(all(test, feature = "sqlite-store"))]
mod tests {
    use super::*;
    use crate::services::{session_service::create_session, test_support::test_state};

    #[tokio::test]
    async fn blank_responses_are_never_stored() {
        let state = test_state();
        let session = create_session(&state, "q").await.unwrap();

        for blank in ["", "   ", "\t\n"] {
            let err = add_response(&state, session.id, blank).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
        assert!(state.store().list_responses(session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn responses_are_trimmed_before_storage() {
        let state = test_state();
        let session = create_session(&state, "q").await.unwrap();

        let stored = add_response(&state, session.id, "  Blue  ").await.unwrap();
        assert_eq!(stored.response, "Blue");
        assert_eq!(get_responses(&state, session.id).await.unwrap(), vec!["Blue"]);
    }

    #[tokio::test]
    async fn responses_come_back_newest_first() {
        let state = test_state();
        let session = create_session(&state, "q").await.unwrap();
        for text in ["A", "B", "C"] {
            add_response(&state, session.id, text).await.unwrap();
        }

        assert_eq!(
            get_responses(&state, session.id).await.unwrap(),
            vec!["C", "B", "A"]
        );
    }

    #[tokio::test]
    async fn legacy_blank_rows_are_filtered_out() {
        let state = test_state();
        let session = create_session(&state, "q").await.unwrap();
        state
            .store()
            .insert_response(session.id, "   ".into())
            .await
            .unwrap();
        add_response(&state, session.id, "Red").await.unwrap();

        assert_eq!(get_responses(&state, session.id).await.unwrap(), vec!["Red"]);
    }

    #[tokio::test]
    async fn recording_notifies_session_subscribers() {
        let state = test_state();
        let session = create_session(&state, "q").await.unwrap();
        let mut receiver = state.live().subscribe(session.id);

        add_response(&state, session.id, "Red").await.unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(
            event.event.as_deref(),
            Some(sse_events::EVENT_RESPONSE_RECORDED)
        );
    }
}
