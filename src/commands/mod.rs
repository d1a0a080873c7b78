/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat` - Interactive chat and one-shot send
- `sessions` - List, show and delete conversations
- `favorites` - List and remove favorite candidates
- `postings` - List, create and delete job postings

Every handler works on a [`Services`] bundle built from configuration.
*/

use crate::chat::ChatEngine;
use crate::config::{Config, StoreBackend};
use crate::dispatch::WebhookClient;
use crate::error::Result;
use crate::extraction::CandidateBlock;
use crate::favorites::{
    FavoriteCache, FavoriteStore, FavoritesManager, MemoryFavoriteStore, SupabaseFavoriteStore,
};
use crate::postings::{JobPostingStore, MemoryPostingStore, SupabasePostingStore};
use crate::session::SessionId;
use crate::store::{MemoryMessageStore, MessageStore, SupabaseMessageStore};
use crate::supabase::SupabaseClient;
use std::sync::Arc;

// Special commands parser for the chat loop
pub mod special_commands;

// Session management commands
pub mod sessions;

// Favorite management commands
pub mod favorites;

// Job posting commands
pub mod postings;

/// Engine and stores wired from configuration
pub struct Services {
    pub engine: Arc<ChatEngine>,
    pub favorites: Arc<FavoritesManager>,
    pub postings: Arc<dyn JobPostingStore>,
    backend: StoreBackend,
}

impl Services {
    /// Build every component for `config`
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client or the favorites cache cannot be created
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = match &config.favorites.cache_path {
            Some(path) => FavoriteCache::new_with_path(path)?,
            None => FavoriteCache::new()?,
        };

        let (messages, favorite_store, postings): (
            Arc<dyn MessageStore>,
            Arc<dyn FavoriteStore>,
            Arc<dyn JobPostingStore>,
        ) = match config.store.backend {
            StoreBackend::Supabase => {
                let supabase = &config.supabase;
                let client = SupabaseClient::new(supabase)?;
                (
                    Arc::new(SupabaseMessageStore::new(
                        client.clone(),
                        &supabase.messages_table,
                    )),
                    Arc::new(SupabaseFavoriteStore::new(
                        client.clone(),
                        &supabase.favorites_table,
                        &supabase.recruiter_id,
                    )),
                    Arc::new(SupabasePostingStore::new(
                        client,
                        &supabase.postings_table,
                        &supabase.recruiter_id,
                    )),
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory stores; history and postings are not saved");
                (
                    Arc::new(MemoryMessageStore::new()),
                    Arc::new(MemoryFavoriteStore::new()),
                    Arc::new(MemoryPostingStore::new(&config.supabase.recruiter_id)),
                )
            }
        };

        let favorites = Arc::new(FavoritesManager::new(
            cache,
            favorite_store,
            config.favorites.require_job_posting,
        )?);
        let dispatcher = Arc::new(WebhookClient::new(&config.webhook)?);
        let engine = ChatEngine::new(messages, dispatcher)
            .with_favorites(Arc::clone(&favorites))
            .with_persist_messages(config.store.persist_messages);

        Ok(Self {
            engine: Arc::new(engine),
            favorites,
            postings,
            backend: config.store.backend,
        })
    }

    /// Pull the remote favorites, falling back to the cached set
    ///
    /// The in-memory backend starts empty, so only the cache is used there.
    pub async fn sync_favorites(&self) {
        if self.backend == StoreBackend::Memory {
            return;
        }
        if let Err(e) = self.favorites.load().await {
            use colored::Colorize;
            println!(
                "{}",
                format!("Could not reach favorites store, showing cached favorites ({})", e)
                    .yellow()
            );
        }
    }
}

/// Shorten a session id for table display
fn short_id(id: &SessionId) -> String {
    let id = id.as_str();
    if id.chars().count() > 24 {
        format!("{}...", id.chars().take(21).collect::<String>())
    } else {
        id.to_string()
    }
}

/// Print candidate cards, marking favorites with a star
fn print_candidates(
    blocks: &[CandidateBlock],
    favorites: &FavoritesManager,
    session: &SessionId,
) {
    use colored::Colorize;

    for block in blocks {
        let star = if favorites.is_favorited(session, block.index) {
            " ★".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {}{}",
            format!("[{}]", block.index + 1).cyan(),
            block.name.bold(),
            star
        );
        if !block.email.is_empty() {
            println!("      Email:   {}", block.email);
        }
        if !block.phone.is_empty() {
            println!("      Phone:   {}", block.phone);
        }
        if !block.profile_link.is_empty() {
            println!("      Profile: {}", block.profile_link.underline());
        }
        if !block.summary.is_empty() {
            println!("      {}", block.summary.dimmed());
        }
        println!();
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Runs a readline loop that sends recruiter text through the
    //! [`ChatEngine`], renders replies (as candidate cards when they hold a
    //! candidate list) and handles the favorite flow. A background poller
    //! keeps the visible history in step with the store.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::error::FavoriteError;
    use crate::extraction::{render_message, MessageView};
    use crate::favorites::AddOutcome;
    use crate::store::{Message, Role};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio_util::sync::CancellationToken;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `session` - Existing session to resume; a new one is started if `None`
    pub async fn run_chat(config: Config, session: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let services = Services::from_config(&config)?;
        services.sync_favorites().await;
        let engine = Arc::clone(&services.engine);

        let current = engine.select_session(session.map(SessionId::new)).await;

        let token = CancellationToken::new();
        let poller = engine.spawn_poller(config.sync.poll_interval(), token.clone());

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(&current);
        let mut shown = 0;

        loop {
            shown = print_new_messages(&services, shown);
            match rl.readline(&format!("{} ", ">>".cyan().bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    };

                    rl.add_history_entry(trimmed)?;

                    match command {
                        SpecialCommand::NewSession => {
                            let id = engine.select_session(None).await;
                            println!("Started new conversation {}\n", id.as_str().cyan());
                            shown = 0;
                        }
                        SpecialCommand::SwitchSession(id) => {
                            let id = engine.select_session(Some(SessionId::new(id))).await;
                            println!("Switched to conversation {}\n", id.as_str().cyan());
                            shown = print_new_messages(&services, 0);
                        }
                        SpecialCommand::ListSessions => {
                            if let Err(e) = sessions::print_sessions(&engine).await {
                                eprintln!("{}\n", format!("Error: {}", e).red());
                            }
                        }
                        SpecialCommand::History => {
                            // failures are logged and keep the current view
                            let _ = engine.refresh().await;
                            shown = print_new_messages(&services, 0);
                        }
                        SpecialCommand::Favorite { number, posting } => {
                            handle_favorite(&services, &mut rl, number, posting).await;
                        }
                        SpecialCommand::Unfavorite(number) => {
                            handle_unfavorite(&services, number).await;
                        }
                        SpecialCommand::ListFavorites => {
                            favorites::print_favorites(&services.favorites, None);
                        }
                        SpecialCommand::ListPostings => {
                            if let Err(e) = postings::print_postings(&services).await {
                                eprintln!("{}\n", format!("Error: {}", e).red());
                            }
                        }
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => {
                            println!("{}", "Assistant is typing...".dimmed());
                            match engine.send(trimmed).await {
                                Ok(outcome) => {
                                    if outcome.applied {
                                        shown = print_new_messages(&services, shown);
                                    } else {
                                        println!(
                                            "{}\n",
                                            format!(
                                                "Reply for {} arrived after switching conversations",
                                                outcome.session
                                            )
                                            .yellow()
                                        );
                                    }
                                }
                                Err(e) => eprintln!("{}\n", format!("Error: {}", e).red()),
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        token.cancel();
        if let Err(e) = poller.await {
            tracing::warn!("History poller ended abnormally: {}", e);
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Send one message and print the reply
    pub async fn run_send(config: Config, session: Option<String>, text: String) -> Result<()> {
        let services = Services::from_config(&config)?;
        services.sync_favorites().await;
        let engine = &services.engine;

        engine.select_session(session.map(SessionId::new)).await;
        let outcome = engine.send(&text).await?;

        print_message(&services, &outcome.session, &outcome.reply);
        println!("Session: {}", outcome.session.as_str().cyan());
        if let Some(error) = outcome.dispatch_error {
            return Err(error.into());
        }
        Ok(())
    }

    /// Print messages past index `shown`; returns the new count
    fn print_new_messages(services: &Services, shown: usize) -> usize {
        let messages = services.engine.messages();
        let Some(session) = services.engine.current_session() else {
            return messages.len();
        };
        for message in messages.iter().skip(shown) {
            print_message(services, &session, message);
        }
        messages.len()
    }

    pub(super) fn print_message(services: &Services, session: &SessionId, message: &Message) {
        let label = match message.role {
            Role::Human => message.role.to_string().green().bold(),
            Role::Assistant => message.role.to_string().blue().bold(),
        };
        let time = message
            .created_at
            .map(|t| t.format(" %H:%M").to_string())
            .unwrap_or_default();
        let pending = if message.id.is_local() {
            " (not saved)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{}{}{}", label, time.dimmed(), pending);

        match render_message(&message.content) {
            MessageView::Plain(text) => println!("{}\n", text),
            MessageView::Candidates { preamble, blocks } => {
                if !preamble.is_empty() {
                    println!("{}\n", preamble);
                }
                print_candidates(&blocks, &services.favorites, session);
            }
        }
    }

    async fn handle_favorite(
        services: &Services,
        rl: &mut DefaultEditor,
        number: usize,
        posting: Option<i64>,
    ) {
        let Some(session) = services.engine.current_session() else {
            println!("{}\n", "No conversation selected.".yellow());
            return;
        };
        let candidates = services.engine.latest_candidates();
        let Some(candidate) = candidates.get(number - 1) else {
            println!(
                "{}\n",
                format!(
                    "No candidate {} in the latest reply ({} shown).",
                    number,
                    candidates.len()
                )
                .yellow()
            );
            return;
        };

        let outcome = match services
            .favorites
            .add_favorite(&session, candidate, posting)
            .await
        {
            Ok(AddOutcome::AwaitingPosting(_)) => match choose_posting(services, rl).await {
                Some(posting_id) => services.favorites.complete_pending(posting_id).await,
                None => {
                    services.favorites.cancel_pending();
                    println!("{}\n", "Favorite cancelled.".yellow());
                    return;
                }
            },
            other => other,
        };
        report_favorite(&candidate.name, outcome);
    }

    fn report_favorite(name: &str, outcome: std::result::Result<AddOutcome, FavoriteError>) {
        match outcome {
            Ok(AddOutcome::Added) => {
                println!("{}\n", format!("★ {} added to favorites", name).green())
            }
            Ok(AddOutcome::AlreadyFavorited) => {
                println!("{}\n", format!("{} is already a favorite", name).yellow())
            }
            Ok(AddOutcome::AwaitingPosting(_)) => {
                println!("{}\n", "Choose a job posting to finish.".yellow())
            }
            Err(e) => eprintln!("{}\n", format!("Could not favorite {}: {}", name, e).red()),
        }
    }

    /// Ask which job posting a favorite belongs to
    ///
    /// Accepts a posting id, `new <title>` to create one, or an empty line
    /// to cancel.
    async fn choose_posting(services: &Services, rl: &mut DefaultEditor) -> Option<i64> {
        if let Err(e) = postings::print_postings(services).await {
            eprintln!("{}", format!("Could not load job postings: {}", e).red());
        }
        loop {
            let line = match rl.readline("Job posting id (or 'new <title>', empty to cancel): ") {
                Ok(line) => line,
                Err(_) => return None,
            };
            let answer = line.trim();
            if answer.is_empty() {
                return None;
            }
            if let Some(title) = answer.strip_prefix("new ") {
                match services.postings.create(title).await {
                    Ok(posting) => {
                        println!(
                            "{}",
                            format!("Created job posting {} ({})", posting.title, posting.id)
                                .green()
                        );
                        return Some(posting.id);
                    }
                    Err(e) => {
                        eprintln!("{}", format!("Could not create job posting: {}", e).red());
                        continue;
                    }
                }
            }
            match answer.parse::<i64>() {
                Ok(id) => return Some(id),
                Err(_) => println!("{}", "Enter a numeric posting id.".yellow()),
            }
        }
    }

    async fn handle_unfavorite(services: &Services, number: usize) {
        let Some(session) = services.engine.current_session() else {
            println!("{}\n", "No conversation selected.".yellow());
            return;
        };
        let index = number - 1;
        if !services.favorites.is_favorited(&session, index) {
            println!(
                "{}\n",
                format!("Candidate {} is not a favorite.", number).yellow()
            );
            return;
        }
        match services.favorites.remove_favorite(&session, index).await {
            Ok(()) => println!(
                "{}\n",
                format!("Candidate {} removed from favorites", number).green()
            ),
            Err(e) => eprintln!("{}\n", format!("Could not remove favorite: {}", e).red()),
        }
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner(session: &SessionId) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║          RecruitChat Interactive Chat - Welcome!             ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Session: {}", session.as_str().cyan());
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }
}
