use super::{short_id, Services};
use crate::cli::FavoriteCommand;
use crate::error::{RecruitChatError, Result};
use crate::favorites::FavoritesManager;
use crate::session::SessionId;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle favorite commands
pub async fn handle_favorites(services: &Services, command: FavoriteCommand) -> Result<()> {
    services.sync_favorites().await;

    match command {
        FavoriteCommand::List { posting } => print_favorites(&services.favorites, posting),
        FavoriteCommand::Remove { session, number } => {
            if number == 0 {
                return Err(RecruitChatError::Config(
                    "Candidate numbers start at 1".to_string(),
                )
                .into());
            }
            let session = SessionId::new(session);
            let index = number - 1;
            if !services.favorites.is_favorited(&session, index) {
                println!(
                    "{}",
                    format!("Candidate {} of {} is not a favorite.", number, session).yellow()
                );
                return Ok(());
            }
            services.favorites.remove_favorite(&session, index).await?;
            println!(
                "{}",
                format!("Removed candidate {} of {} from favorites", number, session).green()
            );
        }
    }

    Ok(())
}

/// Print favorites as a table, optionally for one job posting
pub(super) fn print_favorites(favorites: &FavoritesManager, posting: Option<i64>) {
    let listed = match posting {
        Some(id) => favorites.list_for_posting(id),
        None => favorites.list(),
    };

    if listed.is_empty() {
        println!("{}", "No favorite candidates found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "Session".bold(),
        "#".bold(),
        "Name".bold(),
        "Email".bold(),
        "Phone".bold(),
        "Posting".bold()
    ]);

    for favorite in listed {
        let posting = favorite
            .job_posting_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(prettytable::row![
            short_id(&favorite.session_id).cyan(),
            favorite.candidate_index + 1,
            favorite.name,
            favorite.email,
            favorite.phone,
            posting
        ]);
    }

    println!("\nFavorite candidates:");
    table.printstd();
    println!();
}
