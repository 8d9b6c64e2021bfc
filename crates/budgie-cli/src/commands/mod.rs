//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db)
//! - `analyze` - Receipt analysis
//! - `categories` - Category management commands
//! - `config` - Effective configuration display
//! - `engines` - OCR engine availability
//! - `models` - Gemini model probing
//! - `prompts` - Prompt library management commands

pub mod analyze;
pub mod categories;
pub mod config;
pub mod core;
pub mod engines;
pub mod models;
pub mod prompts;

// Re-export command functions for main.rs
pub use analyze::*;
pub use categories::*;
pub use config::*;
pub use core::*;
pub use engines::*;
pub use models::*;
pub use prompts::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
