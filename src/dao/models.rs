use std::time::SystemTime;
use uuid::Uuid;

/// Key under which the moderator credential lives in the config table.
pub const MODERATOR_PASSWORD_KEY: &str = "moderator_password";

/// Poll session persisted by the storage layer. Sessions are never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Six digit code shared with participants.
    pub pin: String,
    /// Question asked to the participants.
    pub question: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Participant answer attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEntity {
    /// Primary key of the response.
    pub id: Uuid,
    /// Session the response belongs to.
    pub session_id: Uuid,
    /// Trimmed free text. Legacy rows may hold an empty value.
    pub response: String,
    /// Submission timestamp.
    pub created_at: SystemTime,
}
