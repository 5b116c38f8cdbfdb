use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Per-session broadcast hubs used to push "something changed" notifications to live views.
pub struct LiveHubs {
    sessions: DashMap<Uuid, SseHub>,
    capacity: usize,
}

impl LiveHubs {
    /// Build an empty registry; hubs are created lazily with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            capacity,
        }
    }

    /// Register a subscriber on the hub of `session_id`, creating the hub on first use.
    pub fn subscribe(&self, session_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.sessions
            .entry(session_id)
            .or_insert_with(|| SseHub::new(self.capacity))
            .subscribe()
    }

    /// Send an event to the subscribers of `session_id`. A hub nobody listens to any more is
    /// dropped instead.
    pub fn broadcast(&self, session_id: Uuid, event: ServerEvent) {
        if let Some(hub) = self.sessions.get(&session_id) {
            hub.broadcast(event);
        }
        self.release(session_id);
    }

    /// Remove the hub of `session_id` once its last subscriber is gone.
    pub fn release(&self, session_id: Uuid) -> bool {
        self.sessions
            .remove_if(&session_id, |_, hub| hub.receiver_count() == 0)
            .is_some()
    }

    /// Remove every hub without subscribers, returning how many were dropped.
    pub fn prune(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, hub| hub.receiver_count() > 0);
        before.saturating_sub(self.sessions.len())
    }

    /// Number of hubs currently allocated.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
