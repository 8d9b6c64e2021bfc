//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Budgie - Turn receipt photos into transactions
#[derive(Parser)]
#[command(name = "budgie")]
#[command(about = "Receipt-to-transaction extraction with OCR and Gemini", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "budgie.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set BUDGIE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// User whose categories are used
    #[arg(long, default_value = "1", global = true)]
    pub user: i64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed default categories
    Init,

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Extract candidate transactions from receipt photos
    Analyze {
        /// Receipt images (JPEG, PNG, ...), analyzed together in one call
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Reference date for undated receipts (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Print candidates as JSON
        #[arg(long)]
        json: bool,

        /// Override the generation model for this run
        #[arg(long)]
        model: Option<String>,
    },

    /// Show which OCR engines are available
    Engines,

    /// Check which Gemini models the configured key can reach
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },

    /// Manage prompts
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },

    /// Print the effective pipeline configuration
    Config,
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories
    List,

    /// Add a category
    Add {
        /// Category name
        name: String,

        /// Icon (emoji)
        #[arg(long, default_value = "🏷️")]
        icon: String,

        /// Color (hex)
        #[arg(long, default_value = "#6b7280")]
        color: String,

        /// Keyword hints, comma-separated
        #[arg(short, long)]
        keywords: Option<String>,
    },

    /// Remove a category
    Remove {
        /// Category ID
        id: i64,
    },

    /// Seed the default categories (existing names are kept)
    Seed,
}

#[derive(Subcommand)]
pub enum ModelsAction {
    /// Send a trivial prompt to each model
    Probe {
        /// Models to probe (defaults to a known list)
        models: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all prompts and their override status
    List,

    /// Show a prompt's content
    Show {
        /// Prompt ID (e.g. analyze_receipts)
        id: String,
    },

    /// Show the override directory path
    Path,
}
