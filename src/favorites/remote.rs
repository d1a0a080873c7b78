use super::types::{Favorite, FavoriteKey, FavoriteRow};
use crate::error::StoreError;
use crate::session::SessionId;
use crate::supabase::{eq, SupabaseClient};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Remote table of favorites, scoped to one recruiter
///
/// The table enforces one row per `(recruiter, session, candidate index)`;
/// inserting a duplicate fails with [`StoreError::UniqueViolation`].
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Favorite>, StoreError>;
    async fn insert(&self, favorite: &Favorite) -> Result<(), StoreError>;
    async fn delete(&self, key: &FavoriteKey) -> Result<(), StoreError>;
    async fn delete_session(&self, session: &SessionId) -> Result<(), StoreError>;
    async fn delete_for_posting(&self, posting_id: i64) -> Result<(), StoreError>;
}

/// Favorites kept in the hosted `chat_favoritos` table
#[derive(Debug, Clone)]
pub struct SupabaseFavoriteStore {
    client: SupabaseClient,
    table: String,
    recruiter_id: String,
}

impl SupabaseFavoriteStore {
    pub fn new(
        client: SupabaseClient,
        table: impl Into<String>,
        recruiter_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            table: table.into(),
            recruiter_id: recruiter_id.into(),
        }
    }
}

#[async_trait]
impl FavoriteStore for SupabaseFavoriteStore {
    async fn list(&self) -> Result<Vec<Favorite>, StoreError> {
        let rows: Vec<FavoriteRow> = self
            .client
            .select(
                &self.table,
                &[
                    eq("recrutador_id", &self.recruiter_id),
                    ("order", "session_id.asc,candidate_index.asc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Favorite::from).collect())
    }

    async fn insert(&self, favorite: &Favorite) -> Result<(), StoreError> {
        let row = FavoriteRow::from_favorite(&self.recruiter_id, favorite);
        let _: Vec<FavoriteRow> = self.client.insert(&self.table, &row).await?;
        Ok(())
    }

    async fn delete(&self, key: &FavoriteKey) -> Result<(), StoreError> {
        self.client
            .delete(
                &self.table,
                &[
                    eq("recrutador_id", &self.recruiter_id),
                    eq("session_id", &key.session_id),
                    eq("candidate_index", key.candidate_index),
                ],
            )
            .await
    }

    async fn delete_session(&self, session: &SessionId) -> Result<(), StoreError> {
        self.client
            .delete(
                &self.table,
                &[
                    eq("recrutador_id", &self.recruiter_id),
                    eq("session_id", session),
                ],
            )
            .await
    }

    async fn delete_for_posting(&self, posting_id: i64) -> Result<(), StoreError> {
        self.client
            .delete(
                &self.table,
                &[
                    eq("recrutador_id", &self.recruiter_id),
                    eq("vaga_id", posting_id),
                ],
            )
            .await
    }
}

/// In-process favorites table for offline mode and tests
#[derive(Debug, Default)]
pub struct MemoryFavoriteStore {
    rows: Mutex<Vec<Favorite>>,
    offline: AtomicBool,
}

impl MemoryFavoriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable table
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of the stored rows
    pub fn rows(&self) -> Vec<Favorite> {
        self.lock().clone()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Request("favorites store is offline".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Favorite>> {
        self.rows.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl FavoriteStore for MemoryFavoriteStore {
    async fn list(&self) -> Result<Vec<Favorite>, StoreError> {
        self.check_online()?;
        Ok(self.rows())
    }

    async fn insert(&self, favorite: &Favorite) -> Result<(), StoreError> {
        self.check_online()?;
        let mut rows = self.lock();
        if rows.iter().any(|f| f.key() == favorite.key()) {
            return Err(StoreError::UniqueViolation(format!(
                "duplicate key ({}, {})",
                favorite.session_id, favorite.candidate_index
            )));
        }
        rows.push(favorite.clone());
        Ok(())
    }

    async fn delete(&self, key: &FavoriteKey) -> Result<(), StoreError> {
        self.check_online()?;
        self.lock().retain(|f| &f.key() != key);
        Ok(())
    }

    async fn delete_session(&self, session: &SessionId) -> Result<(), StoreError> {
        self.check_online()?;
        self.lock().retain(|f| &f.session_id != session);
        Ok(())
    }

    async fn delete_for_posting(&self, posting_id: i64) -> Result<(), StoreError> {
        self.check_online()?;
        self.lock().retain(|f| f.job_posting_id != Some(posting_id));
        Ok(())
    }
}
