//! Special commands parser for interactive chat mode
//!
//! Lines starting with `/` control the session instead of being sent to the
//! assistant. Command names are case-insensitive; arguments such as session
//! ids keep their original case.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new conversation
    NewSession,

    /// List stored conversations
    ListSessions,

    /// Switch to an existing conversation
    SwitchSession(String),

    /// Reload and print the current conversation
    History,

    /// Favorite candidate `number` (1-based) of the latest reply
    Favorite {
        number: usize,
        posting: Option<i64>,
    },

    /// Unfavorite candidate `number` (1-based) of the latest reply
    Unfavorite(usize),

    /// List favorite candidates
    ListFavorites,

    /// List job postings
    ListPostings,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input to the assistant
    None,
}

fn parse_number(command: &str, arg: &str) -> Result<usize, CommandError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        }),
    }
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use recruitchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/fav 2 7").unwrap();
/// assert_eq!(cmd, SpecialCommand::Favorite { number: 2, posting: Some(7) });
///
/// let cmd = parse_special_command("find senior rust developers").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let mut parts = trimmed.split_whitespace();
    let command = parts.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    match (command.as_str(), args.as_slice()) {
        ("/new", []) => Ok(SpecialCommand::NewSession),
        ("/sessions", []) => Ok(SpecialCommand::ListSessions),
        ("/history", []) | ("/refresh", []) => Ok(SpecialCommand::History),
        ("/favorites", []) | ("/favs", []) => Ok(SpecialCommand::ListFavorites),
        ("/postings", []) | ("/vagas", []) => Ok(SpecialCommand::ListPostings),
        ("/help", []) | ("/?", []) => Ok(SpecialCommand::Help),
        ("exit", []) | ("quit", []) | ("/exit", []) | ("/quit", []) => Ok(SpecialCommand::Exit),

        ("/switch", []) => Err(CommandError::MissingArgument {
            command: "/switch".to_string(),
            usage: "/switch <session_id>".to_string(),
        }),
        ("/switch", [id]) => Ok(SpecialCommand::SwitchSession(id.to_string())),

        ("/fav", []) => Err(CommandError::MissingArgument {
            command: "/fav".to_string(),
            usage: "/fav <number> [posting_id]".to_string(),
        }),
        ("/fav", [number]) => Ok(SpecialCommand::Favorite {
            number: parse_number("/fav", number)?,
            posting: None,
        }),
        ("/fav", [number, posting]) => {
            let number = parse_number("/fav", number)?;
            let posting = posting
                .parse::<i64>()
                .map_err(|_| CommandError::UnsupportedArgument {
                    command: "/fav".to_string(),
                    arg: posting.to_string(),
                })?;
            Ok(SpecialCommand::Favorite {
                number,
                posting: Some(posting),
            })
        }

        ("/unfav", []) => Err(CommandError::MissingArgument {
            command: "/unfav".to_string(),
            usage: "/unfav <number>".to_string(),
        }),
        ("/unfav", [number]) => Ok(SpecialCommand::Unfavorite(parse_number("/unfav", number)?)),

        (
            "/new" | "/sessions" | "/history" | "/refresh" | "/favorites" | "/favs" | "/postings"
            | "/vagas" | "/help" | "/?" | "/switch" | "/fav" | "/unfav",
            args,
        ) => Err(CommandError::UnsupportedArgument {
            command: command.clone(),
            arg: args.join(" "),
        }),

        (cmd, _) => Err(CommandError::UnknownCommand(cmd.to_string())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
==========================================

CONVERSATIONS:
  /new               - Start a new conversation
  /sessions          - List stored conversations
  /switch <id>       - Continue an existing conversation
  /history           - Reload and print the current conversation
  /refresh           - Same as /history

CANDIDATES:
  /fav <n> [posting] - Favorite candidate n of the latest reply
  /unfav <n>         - Remove candidate n from favorites
  /favorites         - List favorite candidates
  /postings          - List job postings

SESSION CONTROL:
  /help              - Show this help message
  /?                 - Same as /help
  exit               - Exit interactive mode
  quit               - Same as exit

NOTES:
  - Commands are case-insensitive
  - Regular text (not starting with /) is sent to the assistant
  - Candidate numbers are the ones shown in [brackets] on each card
  - Without a posting id, /fav asks which job posting to save the candidate for
"#
    );
}
