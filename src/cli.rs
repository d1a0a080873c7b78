//! Command-line interface definition for RecruitChat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat and commands for sessions, favorites and
//! job postings.

use clap::{Parser, Subcommand};

/// RecruitChat - recruiting assistant chat client
///
/// Talks to the candidate-search workflow and keeps chat history, favorite
/// candidates and job postings in Supabase.
#[derive(Parser, Debug, Clone)]
#[command(name = "recruitchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the webhook URL from config
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Keep history, favorites and postings in memory only
    #[arg(long)]
    pub offline: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for RecruitChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Resume an existing session instead of starting a new one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Send one message and print the reply
    Send {
        /// Session to send in (a new one is started if omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Message text
        text: String,
    },

    /// Manage chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Manage favorite candidates
    Favorites {
        #[command(subcommand)]
        command: FavoriteCommand,
    },

    /// Manage job postings
    Postings {
        #[command(subcommand)]
        command: PostingCommand,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List sessions, most recent first
    List,

    /// Print the history of a session
    Show {
        /// Session id
        id: String,
    },

    /// Delete a session, its history and its favorites
    Delete {
        /// Session id
        id: String,
    },
}

/// Favorite subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum FavoriteCommand {
    /// List favorite candidates
    List {
        /// Only favorites saved for this job posting
        #[arg(short, long)]
        posting: Option<i64>,
    },

    /// Remove a favorite
    Remove {
        /// Session the candidate was found in
        session: String,

        /// Candidate number as shown in the chat (starting at 1)
        number: usize,
    },
}

/// Job posting subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PostingCommand {
    /// List job postings, newest first
    List,

    /// Create a job posting
    Create {
        /// Posting title
        title: String,
    },

    /// Delete a job posting
    Delete {
        /// Posting id
        id: i64,

        /// Also remove favorites saved for this posting
        #[arg(long)]
        cascade: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            webhook_url: None,
            offline: false,
            command: Commands::Chat { session: None },
        }
    }
}
