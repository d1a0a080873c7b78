//! In-memory view of the current session's messages
//!
//! [`MessageSync`] owns the list a front-end renders. Local messages are
//! shown immediately with a `Local` id and swapped for the stored copy once
//! the store confirms them. A refresh replaces the list only when the ordered
//! id sequence changed, and is dropped if the session changed while the load
//! was in flight.

use crate::error::StoreError;
use crate::session::SessionId;
use crate::store::{Message, MessageId, MessageStore};
use std::sync::{Arc, Mutex, MutexGuard};

/// Result of a refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The visible list was replaced
    Updated,
    /// The loaded ids matched the visible ones; nothing changed
    Unchanged,
    /// The session stopped being current before the load finished
    Discarded,
}

/// A local message the store has not confirmed yet
#[derive(Debug, Clone)]
struct Unconfirmed {
    message: Message,
    /// Highest store id visible when the message was created
    after: i64,
}

#[derive(Debug, Default)]
struct SyncState {
    session: Option<SessionId>,
    messages: Vec<Message>,
    unconfirmed: Vec<Unconfirmed>,
}

impl SyncState {
    fn last_remote_id(&self) -> i64 {
        self.messages
            .iter()
            .filter_map(|m| match m.id {
                MessageId::Remote(id) => Some(id),
                MessageId::Local(_) => None,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Keeps the visible message list in step with the store
pub struct MessageSync {
    store: Arc<dyn MessageStore>,
    state: Mutex<SyncState>,
}

impl MessageSync {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SyncState::default()),
        }
    }

    /// Store backing this view
    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Session whose messages are visible
    pub fn session(&self) -> Option<SessionId> {
        self.lock().session.clone()
    }

    /// Snapshot of the visible messages
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// Point the view at `session` and clear it
    ///
    /// The list is empty until the next refresh completes.
    pub fn reset(&self, session: Option<SessionId>) {
        let mut state = self.lock();
        state.session = session;
        state.messages.clear();
        state.unconfirmed.clear();
    }

    /// Show `message` optimistically if `session` is visible
    ///
    /// Returns false when the session is no longer the visible one.
    pub fn push_local(&self, session: &SessionId, message: Message) -> bool {
        let mut state = self.lock();
        if state.session.as_ref() != Some(session) {
            return false;
        }
        let after = state.last_remote_id();
        state.unconfirmed.push(Unconfirmed {
            message: message.clone(),
            after,
        });
        state.messages.push(message);
        true
    }

    /// Replace the local placeholder `local` with the stored copy
    pub fn confirm(&self, session: &SessionId, local: MessageId, saved: Message) {
        let mut state = self.lock();
        if state.session.as_ref() != Some(session) {
            return;
        }
        state.unconfirmed.retain(|u| u.message.id != local);
        let already_loaded = state.messages.iter().any(|m| m.id == saved.id);
        if already_loaded {
            state.messages.retain(|m| m.id != local);
        } else if let Some(slot) = state.messages.iter_mut().find(|m| m.id == local) {
            *slot = saved;
        }
    }

    /// Number of local messages still waiting for the store
    pub fn unconfirmed_count(&self) -> usize {
        self.lock().unconfirmed.len()
    }

    /// Reload the visible session from the store
    ///
    /// Failures are logged and leave the visible list untouched.
    pub async fn refresh(&self) -> Result<RefreshOutcome, StoreError> {
        let Some(session) = self.session() else {
            return Ok(RefreshOutcome::Unchanged);
        };

        let loaded = match self.store.load(&session).await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(session_id = %session, "History refresh failed: {}", e);
                return Err(e);
            }
        };

        let mut state = self.lock();
        if state.session.as_ref() != Some(&session) {
            tracing::debug!(session_id = %session, "Discarding stale history load");
            return Ok(RefreshOutcome::Discarded);
        }

        let merged = merge(loaded, &state.unconfirmed);
        let unchanged = merged.len() == state.messages.len()
            && merged
                .iter()
                .zip(state.messages.iter())
                .all(|(a, b)| a.id == b.id);
        if unchanged {
            return Ok(RefreshOutcome::Unchanged);
        }

        tracing::debug!(
            session_id = %session,
            count = merged.len(),
            "History changed, updating view"
        );
        state.messages = merged;
        Ok(RefreshOutcome::Updated)
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Stored messages followed by local ones the store does not hold yet
///
/// A local message counts as held when a stored message with the same role
/// and content appeared after it was created.
fn merge(mut loaded: Vec<Message>, unconfirmed: &[Unconfirmed]) -> Vec<Message> {
    let mut claimed = vec![false; loaded.len()];
    let mut pending = Vec::new();

    for u in unconfirmed {
        let held = loaded.iter().enumerate().position(|(i, m)| {
            !claimed[i]
                && matches!(m.id, MessageId::Remote(id) if id > u.after)
                && m.role == u.message.role
                && m.content == u.message.content
        });
        match held {
            Some(i) => claimed[i] = true,
            None => pending.push(u.message.clone()),
        }
    }

    loaded.extend(pending);
    loaded
}
