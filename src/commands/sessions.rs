use super::{short_id, Services};
use crate::chat::ChatEngine;
use crate::cli::SessionCommand;
use crate::error::Result;
use crate::session::SessionId;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle session commands
pub async fn handle_sessions(services: &Services, command: SessionCommand) -> Result<()> {
    let engine = &services.engine;

    match command {
        SessionCommand::List => print_sessions(engine).await?,
        SessionCommand::Show { id } => {
            let session = engine.select_session(Some(SessionId::new(id))).await;
            let messages = engine.messages();
            if messages.is_empty() {
                println!(
                    "{}",
                    format!("No messages found for session {}.", session).yellow()
                );
                return Ok(());
            }
            println!();
            for message in &messages {
                super::chat::print_message(services, &session, message);
            }
        }
        SessionCommand::Delete { id } => {
            let session = SessionId::new(id);
            engine.delete_session(&session).await?;
            println!("{}", format!("Deleted session {}", session).green());
        }
    }

    Ok(())
}

/// Print the stored sessions as a table
pub(super) async fn print_sessions(engine: &ChatEngine) -> Result<()> {
    let sessions = engine.list_sessions().await?;

    if sessions.is_empty() {
        println!("{}", "No conversations found.".yellow());
        return Ok(());
    }

    let current = engine.current_session();
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Last Activity".bold()
    ]);

    for session in sessions {
        let id = if current.as_ref() == Some(&session.id) {
            format!("* {}", short_id(&session.id)).green()
        } else {
            short_id(&session.id).cyan()
        };
        let updated = session
            .last_activity
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(prettytable::row![
            id,
            session.title,
            session.message_count,
            updated
        ]);
    }

    println!("\nConversations:");
    table.printstd();
    println!();
    println!(
        "Use {} to continue a conversation.",
        "recruitchat chat --session <ID>".cyan()
    );
    println!();
    Ok(())
}
