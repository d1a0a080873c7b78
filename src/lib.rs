//! RecruitChat - recruiting assistant chat library
//!
//! This library provides the chat engine behind the RecruitChat client:
//! recruiter messages are forwarded to a workflow webhook, replies are parsed
//! into candidate cards, and candidates can be favorited against job
//! postings. History, favorites and postings live in Supabase tables.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Conversation identity and switching
//! - `store` / `sync`: Remote message log and the in-memory view kept in step with it
//! - `dispatch`: Webhook client and reply interpretation
//! - `extraction`: Candidate parsing from Markdown replies
//! - `favorites`: Favorite reconciliation between the local cache and the remote table
//! - `postings`: Job postings and their deletion policy
//! - `chat`: The engine tying the pieces together
//! - `supabase` / `retry`: Shared PostgREST client and backoff policy
//! - `config`, `error`, `cli`, `commands`: Application plumbing
//!
//! # Example
//!
//! ```no_run
//! use recruitchat::commands::Services;
//! use recruitchat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let services = Services::from_config(&config)?;
//!     let outcome = services.engine.send("Senior Rust developers in Recife").await?;
//!     println!("{}", outcome.reply.content);
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extraction;
pub mod favorites;
pub mod postings;
pub mod retry;
pub mod session;
pub mod store;
pub mod supabase;
pub mod sync;

// Re-export commonly used types
pub use chat::{ChatEngine, SendOutcome};
pub use config::Config;
pub use error::{RecruitChatError, Result};
pub use extraction::{extract_candidates, CandidateBlock};
pub use favorites::FavoritesManager;
pub use session::{SessionId, SessionManager};
