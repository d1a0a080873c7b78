use super::Services;
use crate::cli::PostingCommand;
use crate::error::{FavoriteError, Result};
use crate::postings::{delete_posting, DeletePolicy};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle job posting commands
pub async fn handle_postings(services: &Services, command: PostingCommand) -> Result<()> {
    match command {
        PostingCommand::List => {
            services.sync_favorites().await;
            print_postings(services).await?;
        }
        PostingCommand::Create { title } => {
            let posting = services.postings.create(&title).await?;
            println!(
                "{}",
                format!("Created job posting {} ({})", posting.title, posting.id).green()
            );
        }
        PostingCommand::Delete { id, cascade } => {
            services.sync_favorites().await;
            let policy = if cascade {
                DeletePolicy::Cascade
            } else {
                DeletePolicy::Block
            };
            match delete_posting(services.postings.as_ref(), &services.favorites, id, policy).await
            {
                Ok(()) => println!("{}", format!("Deleted job posting {}", id).green()),
                Err(e @ FavoriteError::PostingInUse { .. }) => {
                    println!(
                        "{}",
                        "Use --cascade to remove those favorites as well.".yellow()
                    );
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

/// Print job postings with their favorite counts
pub(super) async fn print_postings(services: &Services) -> Result<()> {
    let postings = services.postings.list().await?;

    if postings.is_empty() {
        println!("{}", "No job postings found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Favorites".bold(),
        "Created".bold()
    ]);

    for posting in postings {
        let created = posting
            .created_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(prettytable::row![
            posting.id.to_string().cyan(),
            posting.title,
            services.favorites.references_to(posting.id),
            created
        ]);
    }

    println!("\nJob postings:");
    table.printstd();
    println!();
    Ok(())
}
