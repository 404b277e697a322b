//! Per-user session store with TTL eviction.
//!
//! Sessions are created on a user's first message and evicted after a
//! configurable idle period by a background sweep. Turns for one user are
//! serialized through the session's async mutex, so a second message sent
//! before the first turn resolves waits instead of racing on the
//! conversation context.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex as SyncMutex, RwLock};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use souschef_core::RecipeSummary;
use souschef_graph::Vertex;

/// Conversation state for one user.
#[derive(Debug, Default)]
pub struct Session {
    pub user_id: String,
    /// Opaque dialogue-service context, echoed back each turn. Owned by
    /// the service; the bot's own bookkeeping lives in the fields below.
    pub nlu_context: Option<Value>,
    pub user_vertex: Option<Vertex>,
    /// The ingredient or cuisine driving the current cycle.
    pub anchor_vertex: Option<Vertex>,
    /// The numbered list last shown to the user.
    pub recipes: Vec<RecipeSummary>,
}

impl Session {
    fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    /// Clear per-turn conversation state so the next message starts a
    /// fresh cycle. The user vertex survives.
    pub fn reset(&mut self) {
        self.nlu_context = None;
        self.anchor_vertex = None;
        self.recipes.clear();
    }
}

pub struct SessionHandle {
    /// Locked for the duration of a turn.
    pub turn: Mutex<Session>,
    last_active: SyncMutex<Instant>,
}

impl SessionHandle {
    fn new(user_id: &str) -> Self {
        Self {
            turn: Mutex::new(Session::new(user_id)),
            last_active: SyncMutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }
}

/// Process-wide session map keyed by user id.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get_or_create(&self, user_id: &str) -> Arc<SessionHandle> {
        if let Some(handle) = self.sessions.read().get(user_id) {
            return handle.clone();
        }
        let mut sessions = self.sessions.write();
        sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(SessionHandle::new(user_id)))
            .clone()
    }

    /// Drop sessions idle longer than the TTL. Returns how many went.
    pub fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, handle| handle.idle_for() < ttl);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Spawn the background eviction sweep.
pub fn start_sweeper(store: Arc<SessionStore>) {
    let period = (store.ttl() / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            let evicted = store.evict_idle();
            if evicted > 0 {
                debug!("evicted {} idle session(s)", evicted);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_created_once_per_user() {
        let store = SessionStore::new(Duration::from_secs(60));
        let first = store.get_or_create("U1");
        let second = store.get_or_create("U1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn idle_sessions_are_evicted_and_active_ones_kept() {
        let store = SessionStore::new(Duration::from_millis(10));
        store.get_or_create("idle");
        let active = store.get_or_create("active");

        std::thread::sleep(Duration::from_millis(20));
        active.touch();

        assert_eq!(store.evict_idle(), 1);
        assert_eq!(store.len(), 1);
        assert!(Arc::ptr_eq(&store.get_or_create("active"), &active));
    }

    #[tokio::test]
    async fn reset_clears_turn_state_but_keeps_the_user() {
        let store = SessionStore::new(Duration::from_secs(60));
        let handle = store.get_or_create("U1");
        let mut session = handle.turn.lock().await;
        session.nlu_context = Some(serde_json::json!({"is_selection": true}));
        session.recipes.push(RecipeSummary {
            id: "1".to_string(),
            title: "Soup".to_string(),
        });
        session.reset();
        assert!(session.nlu_context.is_none());
        assert!(session.recipes.is_empty());
        assert_eq!(session.user_id, "U1");
    }
}
