mod sse;
pub mod visit;

use std::{sync::Arc, time::Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::poll_store::PollStore,
    error::ServiceError,
    services::auth_gate::AuthGate,
};

pub use self::sse::{LiveHubs, SseHub};
use self::visit::VisitorContext;

pub type SharedState = Arc<AppState>;
/// Buffered notifications per live session hub.
const LIVE_HUB_CAPACITY: usize = 16;

/// Central application state: configuration, the poll store, the auth gate, visitor contexts
/// and live notification hubs.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn PollStore>,
    auth: AuthGate,
    visitors: DashMap<Uuid, VisitorContext>,
    live: LiveHubs,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn PollStore>) -> SharedState {
        let auth = AuthGate::new(config.auth());
        Arc::new(Self {
            config,
            store,
            auth,
            visitors: DashMap::new(),
            live: LiveHubs::new(LIVE_HUB_CAPACITY),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the poll store shared by every visitor.
    pub fn store(&self) -> &dyn PollStore {
        self.store.as_ref()
    }

    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    /// Live notification hubs keyed by session id.
    pub fn live(&self) -> &LiveHubs {
        &self.live
    }

    /// Register a brand new visitor context and return a copy of it.
    pub fn open_visitor(&self, join_pin: Option<&str>) -> VisitorContext {
        let context = VisitorContext::new(Uuid::new_v4(), join_pin);
        self.visitors.insert(context.id(), context.clone());
        context
    }

    /// Whether `id` names a known visitor context.
    pub fn has_visitor(&self, id: Uuid) -> bool {
        self.visitors.contains_key(&id)
    }

    /// Snapshot a visitor context and mark it as seen. The map entry is released before
    /// returning so callers can await freely.
    pub fn visitor(&self, id: Uuid) -> Result<VisitorContext, ServiceError> {
        self.update_visitor(id, |visitor| visitor.clone())
    }

    /// Mutate a visitor context in place and return the closure result.
    pub fn update_visitor<T>(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut VisitorContext) -> T,
    ) -> Result<T, ServiceError> {
        let mut entry = self
            .visitors
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("unknown visitor `{id}`")))?;
        let visitor = entry.value_mut();
        visitor.touch(Instant::now());
        Ok(apply(visitor))
    }

    /// Drop visitor contexts idle for longer than the configured timeout.
    pub fn evict_idle_visitors(&self) -> usize {
        self.evict_idle_visitors_at(Instant::now())
    }

    /// Same as [`AppState::evict_idle_visitors`] with an explicit clock reading.
    pub fn evict_idle_visitors_at(&self, now: Instant) -> usize {
        let timeout = self.config.visitor_idle_timeout();
        let before = self.visitors.len();
        self.visitors
            .retain(|_, visitor| !visitor.is_idle(now, timeout));
        before.saturating_sub(self.visitors.len())
    }
}

#[cfg(all(test, feature = "sqlite-store"))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{config::AppConfig, dao::poll_store::sqlite::SqlitePollStore};

    fn state_with_timeout(timeout: Duration) -> SharedState {
        let store = SqlitePollStore::in_memory().unwrap();
        AppState::new(
            AppConfig::default().with_visitor_idle_timeout(timeout),
            Arc::new(store),
        )
    }

    #[test]
    fn idle_visitors_are_evicted() {
        let state = state_with_timeout(Duration::from_secs(60));
        let ids: Vec<Uuid> = (0..1_000).map(|_| state.open_visitor(None).id()).collect();

        let evicted = state.evict_idle_visitors_at(Instant::now() + Duration::from_secs(61));
        assert_eq!(evicted, 1_000);
        assert!(ids.iter().all(|id| !state.has_visitor(*id)));
    }

    #[test]
    fn recently_used_visitors_survive_eviction() {
        let state = state_with_timeout(Duration::from_secs(60));
        let idle = state.open_visitor(None).id();
        let active = state.open_visitor(None).id();

        let later = Instant::now() + Duration::from_secs(45);
        state
            .update_visitor(active, |visitor| visitor.touch(later))
            .unwrap();

        assert_eq!(
            state.evict_idle_visitors_at(later + Duration::from_secs(30)),
            1
        );
        assert!(!state.has_visitor(idle));
        assert!(state.has_visitor(active));
    }
}
