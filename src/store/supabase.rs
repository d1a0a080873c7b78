use super::types::{HistoryRow, NewHistoryRow, WireMessage};
use super::{summarize_sessions, Message, MessageStore, SessionSummary};
use crate::error::StoreError;
use crate::session::SessionId;
use crate::supabase::{eq, SupabaseClient};
use async_trait::async_trait;

/// Message log stored in the N8N chat history table
#[derive(Debug, Clone)]
pub struct SupabaseMessageStore {
    client: SupabaseClient,
    table: String,
}

impl SupabaseMessageStore {
    pub fn new(client: SupabaseClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

fn valid_rows(rows: Vec<HistoryRow>) -> impl Iterator<Item = (SessionId, Message)> {
    rows.into_iter().filter_map(HistoryRow::into_message)
}

#[async_trait]
impl MessageStore for SupabaseMessageStore {
    async fn load(&self, session: &SessionId) -> Result<Vec<Message>, StoreError> {
        let rows: Vec<HistoryRow> = self
            .client
            .select(
                &self.table,
                &[
                    ("select", "id,session_id,message".to_string()),
                    eq("session_id", session),
                    ("order", "id.asc".to_string()),
                ],
            )
            .await?;
        tracing::debug!(session_id = %session, rows = rows.len(), "Loaded history rows");
        Ok(valid_rows(rows).map(|(_, m)| m).collect())
    }

    async fn append(&self, session: &SessionId, message: &Message) -> Result<Message, StoreError> {
        let body = NewHistoryRow {
            session_id: session.as_str(),
            message: WireMessage::from(message),
        };
        let rows: Vec<HistoryRow> = self.client.insert(&self.table, &body).await?;
        let row = rows.into_iter().next().ok_or_else(|| {
            StoreError::Decode("insert returned no rows".to_string())
        })?;
        tracing::debug!(session_id = %session, row_id = row.id, "Appended message");
        Ok(message.clone().confirmed(row.id))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let rows: Vec<HistoryRow> = self
            .client
            .select(
                &self.table,
                &[
                    ("select", "id,session_id,message".to_string()),
                    ("order", "id.asc".to_string()),
                ],
            )
            .await?;
        Ok(summarize_sessions(valid_rows(rows)))
    }

    async fn delete_session(&self, session: &SessionId) -> Result<(), StoreError> {
        self.client
            .delete(&self.table, &[eq("session_id", session)])
            .await?;
        tracing::info!(session_id = %session, "Deleted session history");
        Ok(())
    }
}
