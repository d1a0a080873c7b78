use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The recruiter
    #[serde(rename = "human", alias = "user")]
    Human,
    /// The AI workflow
    #[serde(rename = "ai", alias = "assistant", alias = "bot")]
    Assistant,
}

impl Role {
    /// Map a stored `type` tag to a role; unknown tags yield `None`
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "human" | "user" => Some(Role::Human),
            "ai" | "assistant" | "bot" => Some(Role::Assistant),
            _ => None,
        }
    }

    /// Tag written to the store
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "ai",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Human => write!(f, "You"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// Message identity: store-assigned row id, or a local placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageId {
    /// Row id assigned by the store (monotonic per table)
    Remote(i64),
    /// Optimistic id for a message not yet confirmed by the store
    Local(Uuid),
}

impl MessageId {
    /// Fresh local placeholder
    pub fn local() -> Self {
        MessageId::Local(Uuid::new_v4())
    }

    /// Returns true for messages not yet confirmed by the store
    pub fn is_local(&self) -> bool {
        matches!(self, MessageId::Local(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Remote(id) => write!(f, "{}", id),
            MessageId::Local(id) => write!(f, "local-{}", id),
        }
    }
}

/// One chat message; never mutated once persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// New optimistic message from the recruiter
    pub fn human(content: impl Into<String>) -> Self {
        Self::local(Role::Human, content)
    }

    /// New optimistic message from the assistant
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::local(Role::Assistant, content)
    }

    fn local(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::local(),
            role,
            content: content.into(),
            created_at: Some(Utc::now()),
        }
    }

    /// Same message carrying the id the store assigned
    pub fn confirmed(mut self, id: i64) -> Self {
        self.id = MessageId::Remote(id);
        self
    }
}

/// Entry in the session list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    /// First recruiter message, shortened
    pub title: String,
    /// Latest message, shortened
    pub preview: String,
    pub message_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

const TITLE_CHARS: usize = 40;
const PREVIEW_CHARS: usize = 60;

/// Fold an id-ordered stream of `(session, message)` pairs into summaries,
/// most recently active session first.
pub fn summarize_sessions<I>(rows: I) -> Vec<SessionSummary>
where
    I: IntoIterator<Item = (SessionId, Message)>,
{
    let mut summaries: Vec<(usize, SessionSummary)> = Vec::new();

    for (position, (session, message)) in rows.into_iter().enumerate() {
        let slot = match summaries.iter().position(|(_, s)| s.id == session) {
            Some(i) => i,
            None => {
                summaries.push((
                    position,
                    SessionSummary {
                        id: session,
                        title: String::new(),
                        preview: String::new(),
                        message_count: 0,
                        last_activity: None,
                    },
                ));
                summaries.len() - 1
            }
        };

        let (last_seen, summary) = &mut summaries[slot];
        *last_seen = position;
        summary.message_count += 1;
        if summary.title.is_empty() && message.role == Role::Human {
            summary.title = truncate(&message.content, TITLE_CHARS);
        }
        summary.preview = truncate(&message.content, PREVIEW_CHARS);
        if message.created_at.is_some() {
            summary.last_activity = message.created_at;
        }
    }

    summaries.sort_by(|a, b| b.0.cmp(&a.0));
    summaries
        .into_iter()
        .map(|(_, mut s)| {
            if s.title.is_empty() {
                s.title = "New conversation".to_string();
            }
            s
        })
        .collect()
}

/// Shorten to `max` characters on one line, appending `...` when cut
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

/// Row of the chat history table as returned by PostgREST
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryRow {
    pub id: i64,
    pub session_id: String,
    pub message: serde_json::Value,
}

/// The `message` JSON column
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Insert body for the chat history table
#[derive(Debug, Serialize)]
pub(crate) struct NewHistoryRow<'a> {
    pub session_id: &'a str,
    pub message: WireMessage,
}

impl HistoryRow {
    /// Validate the row into a [`Message`], or `None` if it is unusable
    pub fn into_message(self) -> Option<(SessionId, Message)> {
        let wire: WireMessage = match serde_json::from_value(self.message) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::warn!(row_id = self.id, "Skipping malformed message row: {}", e);
                return None;
            }
        };
        let Some(role) = Role::from_wire(&wire.kind) else {
            tracing::warn!(
                row_id = self.id,
                "Skipping message row with unknown type '{}'",
                wire.kind
            );
            return None;
        };
        Some((
            SessionId::new(self.session_id),
            Message {
                id: MessageId::Remote(self.id),
                role,
                content: wire.content,
                created_at: wire.timestamp,
            },
        ))
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            kind: message.role.as_wire().to_string(),
            content: message.content.clone(),
            timestamp: message.created_at,
        }
    }
}
