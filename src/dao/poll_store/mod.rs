#[cfg(feature = "sqlite-store")]
pub mod sqlite;

use crate::dao::models::{ResponseEntity, SessionEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for poll sessions, responses and the moderator
/// credential.
///
/// Each call is one unit of work: implementations hold their lock for the whole call and
/// never across calls.
pub trait PollStore: Send + Sync {
    /// Insert a session under the first candidate PIN not already taken.
    ///
    /// Returns `None` when every candidate collides with an existing session.
    fn create_session(
        &self,
        question: String,
        pin_candidates: Vec<String>,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Look up a session by its join PIN.
    fn find_session_by_pin(
        &self,
        pin: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Append a response to a session and return the stored row.
    fn insert_response(
        &self,
        session_id: Uuid,
        response: String,
    ) -> BoxFuture<'static, StorageResult<ResponseEntity>>;
    /// List every response of a session, most recent first.
    fn list_responses(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ResponseEntity>>>;
    /// Stored moderator credential, if any.
    fn moderator_password(&self) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Replace the moderator credential.
    fn set_moderator_password(&self, value: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Store `value` only when no credential exists yet. Returns whether a row was written.
    fn seed_moderator_password(&self, value: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
