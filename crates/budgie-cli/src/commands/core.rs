//! Database setup shared by every command, plus `init`

use std::path::Path;

use anyhow::{Context, Result};
use budgie_core::db::Database;

/// Encrypted unless `--no-encrypt` was passed
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Create the database and give `user_id` the default categories
pub fn cmd_init(db_path: &Path, user_id: i64, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    let seeded = db
        .seed_default_categories(user_id)
        .context("Failed to seed default categories")?;
    println!("   Seeded {} default categories for user {}", seeded, user_id);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Check OCR engines: budgie engines");
    println!("  2. Set GEMINI_API_KEY (environment, .env or secrets.toml)");
    println!("  3. Analyze receipts: budgie analyze receipt.jpg");

    Ok(())
}
