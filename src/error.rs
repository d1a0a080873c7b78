//! Error types for RecruitChat
//!
//! Each component owns a `thiserror` enum describing its failure modes.
//! `RecruitChatError` covers configuration and local I/O, and the
//! application boundary uses `anyhow` through the [`Result`] alias.

use thiserror::Error;

/// Crate-level error for configuration, local storage and I/O
#[derive(Error, Debug)]
pub enum RecruitChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local cache storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures talking to a remote table (messages, favorites, job postings)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The request never produced a response (DNS, connect, reset, timeout)
    #[error("Store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status
    #[error("Store returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// A row with the same unique key already exists
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The response body did not match the expected row shape
    #[error("Failed to decode store response: {0}")]
    Decode(String),

    /// The caller supplied a value the store would reject
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    /// Returns true for failures worth retrying (transport errors, 5xx, 429)
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Request(_) => true,
            StoreError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true for write failures known not to have been applied
    ///
    /// A request error on a write (timeout, dropped connection) leaves the
    /// outcome unknown, so only 5xx and 429 answers qualify.
    pub fn is_retryable_write(&self) -> bool {
        matches!(self, StoreError::Status { .. }) && self.is_transient()
    }

    /// Returns true when the store rejected a duplicate key
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

/// Failures of the remote dispatch (webhook) call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Connection could not be established or was dropped
    #[error("Dispatch network error: {0}")]
    Network(String),

    /// No response within the configured timeout
    #[error("Dispatch timed out after {0} seconds")]
    Timeout(u64),

    /// The endpoint answered with a non-success status
    #[error("Dispatch endpoint returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The reply was not an object with a string `text` field
    #[error("Unexpected dispatch response format: {0}")]
    UnexpectedFormat(String),
}

impl DispatchError {
    /// Returns true for failures worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            DispatchError::Network(_) | DispatchError::Timeout(_) => true,
            DispatchError::Status { status, .. } => *status >= 500 || *status == 429,
            DispatchError::UnexpectedFormat(_) => false,
        }
    }
}

/// Failures of favorite reconciliation and job posting maintenance
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FavoriteError {
    /// The remote table rejected or never received the write
    #[error("Remote favorites store failed: {0}")]
    Remote(#[from] StoreError),

    /// The local cache could not be read or written
    #[error("Favorites cache error: {0}")]
    Cache(String),

    /// Another add/remove for the same candidate is still in flight
    #[error("An operation is already pending for candidate {index} in session {session_id}")]
    OperationPending {
        /// Session owning the candidate
        session_id: String,
        /// Candidate index within its message
        index: usize,
    },

    /// `complete_pending` was called with nothing awaiting a job posting
    #[error("No favorite is awaiting a job posting")]
    NothingPending,

    /// The job posting is still referenced by favorites
    #[error("Job posting {posting_id} is referenced by {count} favorite(s)")]
    PostingInUse {
        /// Job posting id
        posting_id: i64,
        /// Number of favorites referencing it
        count: usize,
    },
}

/// Failures surfaced by the chat engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The message was empty after trimming
    #[error("Cannot send an empty message")]
    EmptyMessage,

    /// A store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A favorites operation failed
    #[error(transparent)]
    Favorite(#[from] FavoriteError),
}

/// Result type alias for RecruitChat operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
