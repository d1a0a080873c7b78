//! Remote append-only message log
//!
//! The [`MessageStore`] trait is the seam between the chat engine and the
//! table holding every session's messages. [`SupabaseMessageStore`] talks to
//! PostgREST; [`MemoryMessageStore`] keeps everything in process for offline
//! use and tests.

use crate::error::StoreError;
use crate::session::SessionId;
use async_trait::async_trait;

pub mod memory;
pub mod supabase;
pub mod types;

pub use memory::MemoryMessageStore;
pub use supabase::SupabaseMessageStore;
pub use types::{summarize_sessions, Message, MessageId, Role, SessionSummary};

/// Append-only, per-session ordered message log
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Full history of `session`, ordered by creation sequence
    ///
    /// Reading is side-effect free; repeated calls with no writes in
    /// between return the same list.
    async fn load(&self, session: &SessionId) -> Result<Vec<Message>, StoreError>;

    /// Append `message` to `session` and return it with its store id
    async fn append(&self, session: &SessionId, message: &Message) -> Result<Message, StoreError>;

    /// One summary per session, most recently active first
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, StoreError>;

    /// Remove every message of `session`
    async fn delete_session(&self, session: &SessionId) -> Result<(), StoreError>;
}
