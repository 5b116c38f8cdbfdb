use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::ResponseEntity,
    dto::sse::{ResponseRecordedEvent, ServerEvent},
    state::SharedState,
};

/// Pushed on a session hub when its responses change.
pub const EVENT_RESPONSE_RECORDED: &str = "responses.changed";
/// Moderator dashboard pushed on the moderate stream.
pub const EVENT_MODERATE_VIEW: &str = "view.moderate";
/// Participant view pushed on the per-session stream.
pub const EVENT_PARTICIPANT_VIEW: &str = "view.participant";
/// Sent once when a participant stream's session cannot be found.
pub const EVENT_SESSION_MISSING: &str = "session.missing";

/// Notify live views of the session that a response was stored.
pub fn broadcast_response_recorded(state: &SharedState, response: &ResponseEntity) {
    let payload = ResponseRecordedEvent::from(response);
    send_session_event(state, response.session_id, EVENT_RESPONSE_RECORDED, &payload);
}

/// Serialise a payload into a named event, logging instead of failing.
pub fn named_event(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}

fn send_session_event(
    state: &SharedState,
    session_id: Uuid,
    event: &str,
    payload: &impl Serialize,
) {
    if let Some(event) = named_event(event, payload) {
        state.live().broadcast(session_id, event);
    }
}
