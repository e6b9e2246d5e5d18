//! Session store with synchronous change notification

use crate::storage::KeyValueStore;
use crate::types::{Role, Session, UserSummary};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Storage key of the persisted refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Callback invoked with the new state after every mutation
pub type SessionListener = Arc<dyn Fn(&Session) + Send + Sync>;

/// Handle returned by [`SessionStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Holds the current [`Session`] and notifies subscribers when it is replaced.
///
/// Every write swaps the whole state at once, so readers either see the
/// previous session or the new one. Listeners run on the writer's thread
/// after the swap.
pub struct SessionStore {
    state: ArcSwap<Session>,
    listeners: Mutex<Vec<(ListenerId, SessionListener)>>,
    next_id: AtomicU64,
}

impl SessionStore {
    /// Create an empty, unauthenticated store
    pub fn new() -> Self {
        Self::with_session(Session::default())
    }

    /// Create a store seeded with `session`
    pub fn with_session(session: Session) -> Self {
        Self {
            state: ArcSwap::from_pointee(session),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> Arc<Session> {
        self.state.load_full()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.load().is_authenticated()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.load().access_token.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.state.load().role
    }

    /// Record a successful login or refresh
    pub fn set_auth(&self, access_token: impl Into<String>, role: Role, user: Option<UserSummary>) {
        self.replace(Session::authenticated(access_token, role, user));
    }

    /// Reset to the empty session
    pub fn clear(&self) {
        self.replace(Session::default());
    }

    /// Replace the whole state and notify listeners
    pub fn replace(&self, session: Session) {
        let session = Arc::new(session);
        self.state.store(Arc::clone(&session));

        let listeners: Vec<SessionListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&session);
        }
    }

    /// Register a listener; it is not called for the current state
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state.load())
            .finish_non_exhaustive()
    }
}

/// Session state plus durable storage, handed to whatever builds the client
#[derive(Clone)]
pub struct SessionContext {
    pub session: Arc<SessionStore>,
    pub storage: Arc<dyn KeyValueStore>,
}

impl SessionContext {
    pub fn new(session: Arc<SessionStore>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self { session, storage }
    }

    /// Fresh empty session backed by an in-memory store
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(SessionStore::new()),
            Arc::new(crate::storage::MemoryStore::new()),
        )
    }
}
