use crate::extraction::CandidateBlock;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// Identity of a favorite: one candidate slot within one session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FavoriteKey {
    pub session_id: SessionId,
    pub candidate_index: usize,
}

impl FavoriteKey {
    pub fn new(session_id: SessionId, candidate_index: usize) -> Self {
        Self {
            session_id,
            candidate_index,
        }
    }
}

/// A candidate the recruiter saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub session_id: SessionId,
    pub candidate_index: usize,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub profile_link: String,
    pub summary: String,
    /// Job posting the candidate was saved for
    pub job_posting_id: Option<i64>,
}

impl Favorite {
    /// Snapshot a parsed candidate for `session`
    pub fn from_candidate(
        session_id: &SessionId,
        candidate: &CandidateBlock,
        job_posting_id: Option<i64>,
    ) -> Self {
        Self {
            session_id: session_id.clone(),
            candidate_index: candidate.index,
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            profile_link: candidate.profile_link.clone(),
            summary: candidate.summary.clone(),
            job_posting_id,
        }
    }

    pub fn key(&self) -> FavoriteKey {
        FavoriteKey::new(self.session_id.clone(), self.candidate_index)
    }
}

/// Reconciliation state of one candidate slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteState {
    Unfavorited,
    /// A remote write for this slot is in flight
    Pending,
    Favorited,
}

/// Result of a favorite request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Saved locally and remotely
    Added,
    /// The candidate was already a favorite; nothing changed
    AlreadyFavorited,
    /// Parked until a job posting is chosen with `complete_pending`
    AwaitingPosting(Favorite),
}

/// Row of the favorites table (column names as stored)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FavoriteRow {
    #[serde(default)]
    pub recrutador_id: String,
    pub session_id: String,
    pub candidate_index: usize,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub resumo: Option<String>,
    #[serde(default)]
    pub vaga_id: Option<i64>,
}

impl FavoriteRow {
    pub fn from_favorite(recruiter_id: &str, favorite: &Favorite) -> Self {
        Self {
            recrutador_id: recruiter_id.to_string(),
            session_id: favorite.session_id.to_string(),
            candidate_index: favorite.candidate_index,
            nome: Some(favorite.name.clone()),
            email: Some(favorite.email.clone()),
            telefone: Some(favorite.phone.clone()),
            link: Some(favorite.profile_link.clone()),
            resumo: Some(favorite.summary.clone()),
            vaga_id: favorite.job_posting_id,
        }
    }
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Self {
            session_id: SessionId::new(row.session_id),
            candidate_index: row.candidate_index,
            name: row.nome.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            phone: row.telefone.unwrap_or_default(),
            profile_link: row.link.unwrap_or_default(),
            summary: row.resumo.unwrap_or_default(),
            job_posting_id: row.vaga_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_with_nulls_defaults_to_empty() {
        let row: FavoriteRow = serde_json::from_value(json!({
            "id": "f1",
            "session_id": "s1",
            "candidate_index": 2,
            "nome": "Ana",
            "email": null,
            "vaga_id": null
        }))
        .unwrap();
        let favorite = Favorite::from(row);
        assert_eq!(favorite.key(), FavoriteKey::new(SessionId::new("s1"), 2));
        assert_eq!(favorite.name, "Ana");
        assert_eq!(favorite.email, "");
        assert_eq!(favorite.phone, "");
        assert_eq!(favorite.job_posting_id, None);
    }

    #[test]
    fn test_row_uses_stored_column_names() {
        let favorite = Favorite {
            session_id: SessionId::new("s1"),
            candidate_index: 0,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: "123".into(),
            profile_link: "https://x".into(),
            summary: "dev".into(),
            job_posting_id: Some(9),
        };
        let value = serde_json::to_value(FavoriteRow::from_favorite("r1", &favorite)).unwrap();
        assert_eq!(value["recrutador_id"], "r1");
        assert_eq!(value["nome"], "Ana");
        assert_eq!(value["telefone"], "123");
        assert_eq!(value["link"], "https://x");
        assert_eq!(value["resumo"], "dev");
        assert_eq!(value["vaga_id"], 9);
    }
}
