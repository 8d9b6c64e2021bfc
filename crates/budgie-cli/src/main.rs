//! Budgie CLI - Receipt photos to candidate transactions
//!
//! Usage:
//!   budgie init                      Initialize database and default categories
//!   budgie analyze a.jpg b.jpg       Extract transactions from receipts
//!   budgie engines                   Show OCR engine availability
//!   budgie models probe              Check which Gemini models the key reaches

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    // GEMINI_API_KEY may live in a local .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.user, cli.no_encrypt),
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(CategoriesAction::List) => commands::cmd_categories_list(&db, cli.user),
                Some(CategoriesAction::Add {
                    name,
                    icon,
                    color,
                    keywords,
                }) => commands::cmd_categories_add(
                    &db,
                    cli.user,
                    &name,
                    &icon,
                    &color,
                    keywords.as_deref(),
                ),
                Some(CategoriesAction::Remove { id }) => {
                    commands::cmd_categories_remove(&db, cli.user, id)
                }
                Some(CategoriesAction::Seed) => commands::cmd_categories_seed(&db, cli.user),
            }
        }
        Commands::Analyze {
            images,
            date,
            json,
            model,
        } => {
            commands::cmd_analyze(
                &cli.db,
                cli.user,
                &images,
                date.as_deref(),
                json,
                model.as_deref(),
                cli.no_encrypt,
            )
            .await
        }
        Commands::Engines => commands::cmd_engines(),
        Commands::Models { action } => match action {
            ModelsAction::Probe { models } => commands::cmd_models_probe(&models).await,
        },
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { id }) => commands::cmd_prompts_show(&id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
        Commands::Config => commands::cmd_config(),
    }
}
