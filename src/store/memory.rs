use super::{summarize_sessions, Message, MessageStore, SessionSummary};
use crate::error::StoreError;
use crate::session::SessionId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-process message log
///
/// Row ids are assigned from a single counter, mirroring a database
/// sequence. `set_offline(true)` makes every call fail with a request error,
/// which is how tests exercise the failure paths.
///
/// # Examples
///
/// ```
/// use recruitchat::session::SessionId;
/// use recruitchat::store::{MemoryMessageStore, Message, MessageStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryMessageStore::new();
/// let session = SessionId::new("s1");
/// let saved = store.append(&session, &Message::human("hello")).await.unwrap();
/// assert!(!saved.id.is_local());
/// assert_eq!(store.load(&session).await.unwrap(), vec![saved]);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    rows: Mutex<Rows>,
    offline: AtomicBool,
}

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    entries: Vec<(SessionId, Message)>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Request("store is offline".to_string()));
        }
        Ok(())
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, Rows> {
        self.rows.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn load(&self, session: &SessionId) -> Result<Vec<Message>, StoreError> {
        self.check_online()?;
        Ok(self
            .rows()
            .entries
            .iter()
            .filter(|(s, _)| s == session)
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn append(&self, session: &SessionId, message: &Message) -> Result<Message, StoreError> {
        self.check_online()?;
        let mut rows = self.rows();
        rows.next_id += 1;
        let saved = message.clone().confirmed(rows.next_id);
        rows.entries.push((session.clone(), saved.clone()));
        Ok(saved)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, StoreError> {
        self.check_online()?;
        Ok(summarize_sessions(self.rows().entries.clone()))
    }

    async fn delete_session(&self, session: &SessionId) -> Result<(), StoreError> {
        self.check_online()?;
        self.rows().entries.retain(|(s, _)| s != session);
        Ok(())
    }
}
