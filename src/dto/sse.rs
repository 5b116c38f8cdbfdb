use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dao::models::ResponseEntity, dto::format_system_time};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on a session hub whenever a participant response is stored.
pub struct ResponseRecordedEvent {
    pub session_id: Uuid,
    pub response_id: Uuid,
    /// RFC3339 timestamp of the stored response.
    pub recorded_at: String,
}

impl From<&ResponseEntity> for ResponseRecordedEvent {
    fn from(response: &ResponseEntity) -> Self {
        Self {
            session_id: response.session_id,
            response_id: response.id,
            recorded_at: format_system_time(response.created_at),
        }
    }
}
