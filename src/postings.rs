//! Job postings ("vagas") owned by the recruiter
//!
//! Favorites reference postings by id without owning them. Deleting a posting
//! that is still referenced is refused unless the caller asks for the
//! referencing favorites to be removed too.

use crate::error::{FavoriteError, StoreError};
use crate::favorites::FavoritesManager;
use crate::supabase::{eq, SupabaseClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A job opening candidates are favorited against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "recrutador_id", default)]
    pub owner_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct NewPosting<'a> {
    titulo: &'a str,
    recrutador_id: &'a str,
}

/// Recruiter-scoped job postings table
#[async_trait]
pub trait JobPostingStore: Send + Sync {
    /// Postings, newest first
    async fn list(&self) -> Result<Vec<JobPosting>, StoreError>;
    async fn create(&self, title: &str) -> Result<JobPosting, StoreError>;
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

/// What to do with favorites referencing a posting being deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Refuse while any favorite references the posting
    #[default]
    Block,
    /// Remove the referencing favorites first
    Cascade,
}

fn validate_title(title: &str) -> Result<&str, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::InvalidInput(
            "job posting title cannot be empty".to_string(),
        ));
    }
    Ok(title)
}

/// Delete a posting under `policy`
///
/// References are counted against the remote favorites table, so rows
/// missing from the local cache still block the delete.
///
/// # Errors
///
/// Returns [`FavoriteError::PostingInUse`] when `policy` is
/// [`DeletePolicy::Block`] and favorites still reference the posting, and
/// [`FavoriteError::Remote`] when those references cannot be read.
pub async fn delete_posting(
    store: &dyn JobPostingStore,
    favorites: &FavoritesManager,
    id: i64,
    policy: DeletePolicy,
) -> Result<(), FavoriteError> {
    match policy {
        DeletePolicy::Block => {
            let count = favorites.count_references(id).await?;
            if count > 0 {
                return Err(FavoriteError::PostingInUse {
                    posting_id: id,
                    count,
                });
            }
        }
        DeletePolicy::Cascade => {
            let removed = favorites.remove_for_posting(id).await?;
            if removed > 0 {
                tracing::info!(posting_id = id, removed, "Removed favorites of posting");
            }
        }
    }

    store.delete(id).await?;
    tracing::info!(posting_id = id, "Job posting deleted");
    Ok(())
}

/// Postings kept in the hosted `vagas` table
#[derive(Debug, Clone)]
pub struct SupabasePostingStore {
    client: SupabaseClient,
    table: String,
    recruiter_id: String,
}

impl SupabasePostingStore {
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
impl JobPostingStore for SupabasePostingStore {
    async fn list(&self) -> Result<Vec<JobPosting>, StoreError> {
        self.client
            .select(
                &self.table,
                &[
                    ("select", "id,titulo,recrutador_id,created_at".to_string()),
                    eq("recrutador_id", &self.recruiter_id),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await
    }

    async fn create(&self, title: &str) -> Result<JobPosting, StoreError> {
        let title = validate_title(title)?;
        let rows: Vec<JobPosting> = self
            .client
            .insert(
                &self.table,
                &NewPosting {
                    titulo: title,
                    recrutador_id: &self.recruiter_id,
                },
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.client
            .delete(
                &self.table,
                &[eq("id", id), eq("recrutador_id", &self.recruiter_id)],
            )
            .await
    }
}

/// In-process postings table for offline mode and tests
#[derive(Debug)]
pub struct MemoryPostingStore {
    owner_id: String,
    rows: Mutex<(i64, Vec<JobPosting>)>,
    offline: AtomicBool,
}

impl MemoryPostingStore {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            rows: Mutex::new((0, Vec::new())),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate an unreachable table
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Request("postings store is offline".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (i64, Vec<JobPosting>)> {
        self.rows.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl JobPostingStore for MemoryPostingStore {
    async fn list(&self) -> Result<Vec<JobPosting>, StoreError> {
        self.check_online()?;
        let mut postings = self.lock().1.clone();
        postings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(postings)
    }

    async fn create(&self, title: &str) -> Result<JobPosting, StoreError> {
        self.check_online()?;
        let title = validate_title(title)?;
        let mut rows = self.lock();
        rows.0 += 1;
        let posting = JobPosting {
            id: rows.0,
            title: title.to_string(),
            owner_id: self.owner_id.clone(),
            created_at: Some(Utc::now()),
        };
        rows.1.push(posting.clone());
        Ok(posting)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.check_online()?;
        self.lock().1.retain(|p| p.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::CandidateBlock;
    use crate::favorites::{FavoriteCache, MemoryFavoriteStore};
    use crate::session::SessionId;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn candidate(index: usize) -> CandidateBlock {
        CandidateBlock {
            index,
            name: format!("Candidate {}", index),
            email: String::new(),
            phone: String::new(),
            profile_link: String::new(),
            summary: String::new(),
            raw: String::new(),
        }
    }

    #[test]
    fn test_posting_row_names() {
        let posting: JobPosting = serde_json::from_value(json!({
            "id": 3,
            "titulo": "Backend Engineer",
            "recrutador_id": "r1",
            "created_at": "2024-05-01T10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(posting.title, "Backend Engineer");
        assert_eq!(posting.owner_id, "r1");
        assert!(posting.created_at.is_some());
    }

    #[test]
    fn test_posting_row_without_optional_columns() {
        let posting: JobPosting =
            serde_json::from_value(json!({"id": 1, "titulo": "QA"})).unwrap();
        assert_eq!(posting.owner_id, "");
        assert_eq!(posting.created_at, None);
    }

    #[tokio::test]
    async fn test_memory_store_lists_newest_first() {
        let store = MemoryPostingStore::new("r1");
        let first = store.create("Backend").await.unwrap();
        let second = store.create("  Frontend  ").await.unwrap();
        assert_eq!(second.title, "Frontend");

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let store = MemoryPostingStore::new("r1");
        let result = store.create("   ").await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete_policy() {
        let dir = tempdir().unwrap();
        let cache = FavoriteCache::new_with_path(dir.path().join("favorites.db")).unwrap();
        let favorites =
            FavoritesManager::new(cache, Arc::new(MemoryFavoriteStore::new()), true).unwrap();
        let store = MemoryPostingStore::new("r1");
        let posting = store.create("Backend").await.unwrap();
        let unused = store.create("Unused").await.unwrap();

        favorites
            .add_favorite(&SessionId::new("s1"), &candidate(0), Some(posting.id))
            .await
            .unwrap();

        delete_posting(&store, &favorites, unused.id, DeletePolicy::Block)
            .await
            .unwrap();

        let blocked = delete_posting(&store, &favorites, posting.id, DeletePolicy::Block).await;
        assert_eq!(
            blocked,
            Err(FavoriteError::PostingInUse {
                posting_id: posting.id,
                count: 1
            })
        );
        assert_eq!(store.list().await.unwrap().len(), 1);

        delete_posting(&store, &favorites, posting.id, DeletePolicy::Cascade)
            .await
            .unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(favorites.list().is_empty());
    }
}
