use super::types::{Favorite, FavoriteKey};
use crate::error::{RecruitChatError, Result};
use crate::session::SessionId;
use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// Local copy of the recruiter's favorites
///
/// Keeps favorites available across restarts and while the remote table is
/// unreachable. The remote table stays authoritative: `replace_all` is used
/// whenever a fresh remote list arrives.
#[derive(Debug, Clone)]
pub struct FavoriteCache {
    db_path: PathBuf,
}

fn storage_error(e: anyhow::Error) -> RecruitChatError {
    RecruitChatError::Storage(format!("{:#}", e))
}

impl FavoriteCache {
    /// Open the cache in the user's data directory
    ///
    /// `RECRUITCHAT_FAVORITES_DB` overrides the location.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("RECRUITCHAT_FAVORITES_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "recruitchat", "recruitchat").ok_or_else(|| {
            RecruitChatError::Storage("Could not determine data directory".into())
        })?;

        Self::new_with_path(proj_dirs.data_dir().join("favorites.db"))
    }

    /// Open the cache at `db_path`, creating parent directories
    ///
    /// # Examples
    ///
    /// ```
    /// use recruitchat::favorites::FavoriteCache;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let cache = FavoriteCache::new_with_path(dir.path().join("favorites.db")).unwrap();
    /// assert!(cache.list().unwrap().is_empty());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(storage_error)?;
        }

        let cache = Self { db_path };
        cache.init()?;
        Ok(cache)
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(storage_error)?)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS favorites (
                session_id TEXT NOT NULL,
                candidate_index INTEGER NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                profile_link TEXT NOT NULL,
                summary TEXT NOT NULL,
                job_posting_id INTEGER,
                saved_at TEXT NOT NULL,
                PRIMARY KEY (session_id, candidate_index)
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(storage_error)?;
        Ok(())
    }

    /// Every cached favorite, ordered by session and index
    pub fn list(&self) -> Result<Vec<Favorite>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(
                "SELECT session_id, candidate_index, name, email, phone, profile_link,
                    summary, job_posting_id
                FROM favorites
                ORDER BY session_id, candidate_index",
            )
            .context("Failed to prepare statement")
            .map_err(storage_error)?;

        let rows = stmt
            .query_map([], |row| {
                let session_id: String = row.get(0)?;
                let candidate_index: i64 = row.get(1)?;
                Ok(Favorite {
                    session_id: SessionId::new(session_id),
                    candidate_index: candidate_index.max(0) as usize,
                    name: row.get(2)?,
                    email: row.get(3)?,
                    phone: row.get(4)?,
                    profile_link: row.get(5)?,
                    summary: row.get(6)?,
                    job_posting_id: row.get(7)?,
                })
            })
            .context("Failed to query favorites")
            .map_err(storage_error)?;

        let mut favorites = Vec::new();
        for favorite in rows.flatten() {
            favorites.push(favorite);
        }
        Ok(favorites)
    }

    /// Insert or overwrite one favorite
    pub fn upsert(&self, favorite: &Favorite) -> Result<()> {
        let conn = self.open()?;
        insert_row(&conn, favorite)
            .context("Failed to save favorite")
            .map_err(storage_error)?;
        Ok(())
    }

    /// Delete one favorite; missing keys are ignored
    pub fn remove(&self, key: &FavoriteKey) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "DELETE FROM favorites WHERE session_id = ? AND candidate_index = ?",
            params![key.session_id.as_str(), key.candidate_index as i64],
        )
        .context("Failed to delete favorite")
        .map_err(storage_error)?;
        Ok(())
    }

    /// Delete every favorite of `session`
    pub fn remove_session(&self, session: &SessionId) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "DELETE FROM favorites WHERE session_id = ?",
            params![session.as_str()],
        )
        .context("Failed to delete session favorites")
        .map_err(storage_error)?;
        Ok(())
    }

    /// Replace the whole cache in one transaction
    pub fn replace_all(&self, favorites: &[Favorite]) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(storage_error)?;

        tx.execute("DELETE FROM favorites", [])
            .context("Failed to clear favorites")
            .map_err(storage_error)?;
        for favorite in favorites {
            insert_row(&tx, favorite)
                .context("Failed to save favorite")
                .map_err(storage_error)?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(storage_error)?;
        Ok(())
    }
}

fn insert_row(conn: &Connection, favorite: &Favorite) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO favorites (session_id, candidate_index, name, email, phone,
            profile_link, summary, job_posting_id, saved_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            favorite.session_id.as_str(),
            favorite.candidate_index as i64,
            favorite.name,
            favorite.email,
            favorite.phone,
            favorite.profile_link,
            favorite.summary,
            favorite.job_posting_id,
            Utc::now().to_rfc3339(),
        ],
    )
}
