/// Response statistics: counts, ranking, most popular.
pub mod aggregation;
/// Moderator password verification and rotation.
pub mod auth_gate;
/// OpenAPI documentation generation.
pub mod documentation;
/// Visitor flow: modes, sign-in and the rendered views.
pub mod flow_service;
/// Health check service.
pub mod health_service;
/// Background eviction of idle visitors and unwatched hubs.
pub mod housekeeping;
/// Join links and QR codes.
pub mod join_link;
/// Participant responses.
pub mod response_service;
/// Session creation and PIN lookup.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streams for moderators and participants.
pub mod sse_service;
/// Phrase cloud layout.
pub mod word_cloud;

#[cfg(all(test, feature = "sqlite-store"))]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::{
        config::AppConfig,
        dao::poll_store::sqlite::SqlitePollStore,
        state::{AppState, SharedState},
    };

    pub const TEST_PASSWORD: &str = "admin123";

    /// Fresh state over an in-memory store. The credential is not seeded, so sign-in checks
    /// fall back to [`TEST_PASSWORD`] until a password change stores one.
    pub fn test_state() -> SharedState {
        test_state_with(AppConfig::default())
    }

    /// Like [`test_state`] with a custom configuration; the test password is always set.
    pub fn test_state_with(config: AppConfig) -> SharedState {
        let store = SqlitePollStore::in_memory().expect("in-memory store");
        AppState::new(
            config.with_default_moderator_password(TEST_PASSWORD),
            Arc::new(store),
        )
    }
}
