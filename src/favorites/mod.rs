//! Favorites reconciliation
//!
//! A favorite is keyed by `(session, candidate index)`. Changes are applied to
//! the in-memory set and the local cache first, then written to the remote
//! table. A confirmed remote failure restores the key to its previous entry so
//! the two sides never silently diverge.

pub mod cache;
pub mod remote;
pub mod types;

pub use cache::FavoriteCache;
pub use remote::{FavoriteStore, MemoryFavoriteStore, SupabaseFavoriteStore};
pub use types::{AddOutcome, Favorite, FavoriteKey, FavoriteState};

use crate::error::FavoriteError;
use crate::extraction::CandidateBlock;
use crate::session::SessionId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct FavoritesState {
    favorites: HashMap<FavoriteKey, Favorite>,
    /// Keys with a remote write in flight
    pending: HashSet<FavoriteKey>,
    /// Favorite parked until a job posting is chosen
    awaiting: Option<Favorite>,
    /// Sessions whose favorites are being deleted remotely
    removing_sessions: HashSet<SessionId>,
    /// Job postings whose favorites are being deleted remotely
    removing_postings: HashSet<i64>,
}

impl FavoritesState {
    /// A key with a write in flight, matching `filter`
    fn pending_where(&self, filter: impl Fn(&FavoriteKey) -> bool) -> Option<FavoriteKey> {
        self.pending.iter().find(|key| filter(key)).cloned()
    }

    /// True while a bulk removal covers `favorite`
    fn is_being_removed(&self, favorite: &Favorite) -> bool {
        self.removing_sessions.contains(&favorite.session_id)
            || favorite
                .job_posting_id
                .is_some_and(|id| self.removing_postings.contains(&id))
    }
}

/// Owns the recruiter's favorite set
pub struct FavoritesManager {
    cache: FavoriteCache,
    remote: Arc<dyn FavoriteStore>,
    require_job_posting: bool,
    state: Mutex<FavoritesState>,
}

impl FavoritesManager {
    /// Create a manager seeded from the local cache
    ///
    /// Call [`load`](Self::load) afterwards to pull the remote set.
    pub fn new(
        cache: FavoriteCache,
        remote: Arc<dyn FavoriteStore>,
        require_job_posting: bool,
    ) -> Result<Self, FavoriteError> {
        let cached = cache
            .list()
            .map_err(|e| FavoriteError::Cache(format!("{:#}", e)))?;
        tracing::debug!(count = cached.len(), "Loaded cached favorites");

        let favorites = cached.into_iter().map(|f| (f.key(), f)).collect();
        Ok(Self {
            cache,
            remote,
            require_job_posting,
            state: Mutex::new(FavoritesState {
                favorites,
                ..Default::default()
            }),
        })
    }

    /// Whether new favorites must name a job posting
    pub fn requires_job_posting(&self) -> bool {
        self.require_job_posting
    }

    /// Favorite `candidate` from `session`
    ///
    /// Without a job posting, and with postings required, the favorite is
    /// parked (replacing any earlier parked one) until
    /// [`complete_pending`](Self::complete_pending) is called.
    pub async fn add_favorite(
        &self,
        session: &SessionId,
        candidate: &CandidateBlock,
        job_posting_id: Option<i64>,
    ) -> Result<AddOutcome, FavoriteError> {
        let favorite = Favorite::from_candidate(session, candidate, job_posting_id);

        if job_posting_id.is_none() && self.require_job_posting {
            let key = favorite.key();
            let mut state = self.lock();
            if state.pending.contains(&key) {
                return Err(operation_pending(&key));
            }
            if state.favorites.contains_key(&key) {
                return Ok(AddOutcome::AlreadyFavorited);
            }
            tracing::debug!(
                session_id = %key.session_id,
                index = key.candidate_index,
                "Favorite awaiting job posting"
            );
            state.awaiting = Some(favorite.clone());
            return Ok(AddOutcome::AwaitingPosting(favorite));
        }

        self.save(favorite).await
    }

    /// Save the parked favorite under `job_posting_id`
    pub async fn complete_pending(&self, job_posting_id: i64) -> Result<AddOutcome, FavoriteError> {
        let parked = self.lock().awaiting.take();
        let Some(mut favorite) = parked else {
            return Err(FavoriteError::NothingPending);
        };
        favorite.job_posting_id = Some(job_posting_id);
        self.save(favorite).await
    }

    /// Drop the parked favorite, if any
    pub fn cancel_pending(&self) -> Option<Favorite> {
        self.lock().awaiting.take()
    }

    /// The favorite waiting for a job posting
    pub fn pending_posting(&self) -> Option<Favorite> {
        self.lock().awaiting.clone()
    }

    async fn save(&self, favorite: Favorite) -> Result<AddOutcome, FavoriteError> {
        let key = favorite.key();
        {
            let mut state = self.lock();
            if state.pending.contains(&key) || state.is_being_removed(&favorite) {
                return Err(operation_pending(&key));
            }
            if state.favorites.contains_key(&key) {
                return Ok(AddOutcome::AlreadyFavorited);
            }
            state.pending.insert(key.clone());
            state.favorites.insert(key.clone(), favorite.clone());
        }
        self.cache_upsert(&favorite);

        let result = self.remote.insert(&favorite).await;

        let mut state = self.lock();
        state.pending.remove(&key);
        match result {
            Ok(()) => {
                tracing::info!(
                    session_id = %key.session_id,
                    index = key.candidate_index,
                    "Candidate favorited"
                );
                Ok(AddOutcome::Added)
            }
            Err(e) if e.is_unique_violation() => {
                tracing::debug!(
                    session_id = %key.session_id,
                    index = key.candidate_index,
                    "Favorite already stored remotely"
                );
                Ok(AddOutcome::AlreadyFavorited)
            }
            Err(e) => {
                state.favorites.remove(&key);
                drop(state);
                self.cache_remove(&key);
                tracing::warn!(
                    session_id = %key.session_id,
                    index = key.candidate_index,
                    "Favorite rolled back: {}",
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Unfavorite a candidate; unknown keys are a no-op
    pub async fn remove_favorite(
        &self,
        session: &SessionId,
        candidate_index: usize,
    ) -> Result<(), FavoriteError> {
        let key = FavoriteKey::new(session.clone(), candidate_index);
        let previous = {
            let mut state = self.lock();
            if state.pending.contains(&key) {
                return Err(operation_pending(&key));
            }
            let Some(previous) = state.favorites.remove(&key) else {
                return Ok(());
            };
            state.pending.insert(key.clone());
            previous
        };
        self.cache_remove(&key);

        let result = self.remote.delete(&key).await;

        let mut state = self.lock();
        state.pending.remove(&key);
        match result {
            Ok(()) => {
                tracing::info!(
                    session_id = %key.session_id,
                    index = key.candidate_index,
                    "Candidate unfavorited"
                );
                Ok(())
            }
            Err(e) => {
                state.favorites.insert(key.clone(), previous.clone());
                drop(state);
                self.cache_upsert(&previous);
                tracing::warn!(
                    session_id = %key.session_id,
                    index = key.candidate_index,
                    "Unfavorite rolled back: {}",
                    e
                );
                Err(e.into())
            }
        }
    }

    pub fn is_favorited(&self, session: &SessionId, candidate_index: usize) -> bool {
        let key = FavoriteKey::new(session.clone(), candidate_index);
        self.lock().favorites.contains_key(&key)
    }

    /// Reconciliation state of one candidate slot
    pub fn state(&self, session: &SessionId, candidate_index: usize) -> FavoriteState {
        let key = FavoriteKey::new(session.clone(), candidate_index);
        let state = self.lock();
        if state.pending.contains(&key) {
            FavoriteState::Pending
        } else if state.favorites.contains_key(&key) {
            FavoriteState::Favorited
        } else {
            FavoriteState::Unfavorited
        }
    }

    /// Every favorite, ordered by session and index
    pub fn list(&self) -> Vec<Favorite> {
        let mut favorites: Vec<Favorite> = self.lock().favorites.values().cloned().collect();
        favorites.sort_by_key(Favorite::key);
        favorites
    }

    /// Favorites saved for one job posting
    pub fn list_for_posting(&self, posting_id: i64) -> Vec<Favorite> {
        self.list()
            .into_iter()
            .filter(|f| f.job_posting_id == Some(posting_id))
            .collect()
    }

    /// Number of favorites referencing a job posting
    pub fn references_to(&self, posting_id: i64) -> usize {
        self.lock()
            .favorites
            .values()
            .filter(|f| f.job_posting_id == Some(posting_id))
            .count()
    }

    /// Number of favorites referencing a job posting, read from the remote table
    ///
    /// Local entries are counted too so a favorite still being saved is not
    /// missed. Fails when the remote table cannot be listed.
    pub async fn count_references(&self, posting_id: i64) -> Result<usize, FavoriteError> {
        let remote = self.remote.list().await?;
        let state = self.lock();
        let keys: HashSet<FavoriteKey> = remote
            .iter()
            .chain(state.favorites.values())
            .filter(|f| f.job_posting_id == Some(posting_id))
            .map(Favorite::key)
            .collect();
        Ok(keys.len())
    }

    /// Replace the local set with the remote one
    ///
    /// Keys with a write in flight keep their local entry. On failure the
    /// cached set stays in place.
    pub async fn load(&self) -> Result<usize, FavoriteError> {
        let remote = match self.remote.list().await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!("Failed to load favorites, keeping cached set: {}", e);
                return Err(e.into());
            }
        };

        let snapshot = {
            let mut state = self.lock();
            let mut favorites: HashMap<FavoriteKey, Favorite> =
                remote.into_iter().map(|f| (f.key(), f)).collect();
            for key in &state.pending {
                match state.favorites.get(key) {
                    Some(local) => {
                        favorites.insert(key.clone(), local.clone());
                    }
                    None => {
                        favorites.remove(key);
                    }
                }
            }
            state.favorites = favorites;
            state.favorites.values().cloned().collect::<Vec<_>>()
        };

        if let Err(e) = self.cache.replace_all(&snapshot) {
            tracing::warn!("Failed to refresh favorites cache: {:#}", e);
        }
        tracing::debug!(count = snapshot.len(), "Favorites loaded");
        Ok(snapshot.len())
    }

    /// Drop every favorite of a deleted session
    ///
    /// Refused with [`FavoriteError::OperationPending`] while a write for one
    /// of the session's candidates is in flight; new writes for the session
    /// are refused until the remote delete finishes.
    pub async fn remove_session(&self, session: &SessionId) -> Result<(), FavoriteError> {
        {
            let mut state = self.lock();
            if let Some(key) = state.pending_where(|key| &key.session_id == session) {
                return Err(operation_pending(&key));
            }
            state.removing_sessions.insert(session.clone());
        }

        let result = self.remote.delete_session(session).await;

        {
            let mut state = self.lock();
            state.removing_sessions.remove(session);
            result?;
            state.favorites.retain(|key, _| &key.session_id != session);
            if state
                .awaiting
                .as_ref()
                .is_some_and(|f| &f.session_id == session)
            {
                state.awaiting = None;
            }
        }
        if let Err(e) = self.cache.remove_session(session) {
            tracing::warn!(session_id = %session, "Failed to update favorites cache: {:#}", e);
        }
        Ok(())
    }

    /// Drop every favorite saved for a job posting
    ///
    /// Refused with [`FavoriteError::OperationPending`] while a write for a
    /// favorite of this posting is in flight.
    pub async fn remove_for_posting(&self, posting_id: i64) -> Result<usize, FavoriteError> {
        {
            let mut state = self.lock();
            let busy = state.pending_where(|key| {
                state
                    .favorites
                    .get(key)
                    .is_some_and(|f| f.job_posting_id == Some(posting_id))
            });
            if let Some(key) = busy {
                return Err(operation_pending(&key));
            }
            state.removing_postings.insert(posting_id);
        }

        let result = self.remote.delete_for_posting(posting_id).await;

        let removed: Vec<FavoriteKey> = {
            let mut state = self.lock();
            state.removing_postings.remove(&posting_id);
            result?;
            let keys: Vec<FavoriteKey> = state
                .favorites
                .values()
                .filter(|f| f.job_posting_id == Some(posting_id))
                .map(Favorite::key)
                .collect();
            for key in &keys {
                state.favorites.remove(key);
            }
            keys
        };
        for key in &removed {
            self.cache_remove(key);
        }
        Ok(removed.len())
    }

    fn cache_upsert(&self, favorite: &Favorite) {
        if let Err(e) = self.cache.upsert(favorite) {
            tracing::warn!("Failed to write favorites cache: {:#}", e);
        }
    }

    fn cache_remove(&self, key: &FavoriteKey) {
        if let Err(e) = self.cache.remove(key) {
            tracing::warn!("Failed to write favorites cache: {:#}", e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, FavoritesState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn operation_pending(key: &FavoriteKey) -> FavoriteError {
    FavoriteError::OperationPending {
        session_id: key.session_id.to_string(),
        index: key.candidate_index,
    }
}
