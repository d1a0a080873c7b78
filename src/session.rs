//! Conversation identity and lifecycle
//!
//! A [`SessionManager`] tracks which conversation is current. Ids are
//! generated on the client from the wall clock plus a random suffix, so no
//! central allocator is involved. Subscribers learn about new, selected and
//! deleted sessions through a broadcast channel.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tokio::sync::broadcast;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque conversation identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing id (e.g. one read back from the store)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id of the form `session_<millis>_<base36 suffix>`
    ///
    /// # Examples
    ///
    /// ```
    /// use recruitchat::session::SessionId;
    ///
    /// let id = SessionId::generate();
    /// assert!(id.as_str().starts_with("session_"));
    /// assert_ne!(id, SessionId::generate());
    /// ```
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let mut rng = rand::rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("session_{}_{}", millis, suffix))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle notifications for session-list front-ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A brand new session id was created
    Created(SessionId),
    /// An existing session became current
    Selected(SessionId),
    /// A session and its history were deleted
    Deleted(SessionId),
}

/// Tracks the single current conversation
#[derive(Debug)]
pub struct SessionManager {
    current: Mutex<Option<SessionId>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// Create a manager with no current session
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            current: Mutex::new(None),
            events,
        }
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Currently selected session, if any
    pub fn current(&self) -> Option<SessionId> {
        self.lock().clone()
    }

    /// Returns true if `id` is the current session
    pub fn is_current(&self, id: &SessionId) -> bool {
        self.lock().as_ref() == Some(id)
    }

    /// Begin a brand new conversation and make it current
    pub fn start_new_session(&self) -> SessionId {
        let id = SessionId::generate();
        *self.lock() = Some(id.clone());
        tracing::info!(session_id = %id, "Started new session");
        self.emit(SessionEvent::Created(id.clone()));
        id
    }

    /// Switch to `target`, or start a new session when `None`
    ///
    /// Returns the id that is now current.
    pub fn select_session(&self, target: Option<SessionId>) -> SessionId {
        match target {
            None => self.start_new_session(),
            Some(id) => {
                *self.lock() = Some(id.clone());
                tracing::debug!(session_id = %id, "Selected session");
                self.emit(SessionEvent::Selected(id.clone()));
                id
            }
        }
    }

    /// Current session, creating one if none is selected yet
    pub fn ensure_session(&self) -> SessionId {
        let id = {
            let mut current = self.lock();
            if let Some(id) = current.as_ref() {
                return id.clone();
            }
            let id = SessionId::generate();
            *current = Some(id.clone());
            id
        };
        tracing::info!(session_id = %id, "Started new session");
        self.emit(SessionEvent::Created(id.clone()));
        id
    }

    /// Announce that `id` was deleted and clear it if it was current
    ///
    /// Returns true when the deleted session was the current one.
    pub fn forget(&self, id: &SessionId) -> bool {
        let was_current = {
            let mut current = self.lock();
            if current.as_ref() == Some(id) {
                *current = None;
                true
            } else {
                false
            }
        };
        self.emit(SessionEvent::Deleted(id.clone()));
        was_current
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SessionId>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
