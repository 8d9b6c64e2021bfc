//! Category storage on SQLite (optionally SQLCipher-encrypted)
//!
//! - `categories` - per-user categories and their keyword hints
//!
//! Every pooled connection is keyed (when encrypted) and the schema is
//! applied once when the pool is opened.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info};

use crate::error::{Error, Result};

mod categories;

pub use categories::{default_categories, CategoryStore, StaticCategories};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Passphrase for the encrypted database
pub const DB_KEY_ENV: &str = "BUDGIE_DB_KEY";

/// Category reads run concurrently, one per analysis
const POOL_SIZE: u32 = 4;

/// Fixed salt: the same passphrase opens the database wherever it lives.
/// Changing it locks out every existing encrypted database.
const KEY_SALT: &[u8; 16] = b"budgie-salt-v1-f";

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    icon TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT '',
    keywords TEXT NOT NULL DEFAULT '',
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(user_id, name)
);

CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);
"#;

/// SQLCipher `PRAGMA key` statement for a passphrase (Argon2id, raw hex key)
fn key_pragma(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    let salt = SaltString::encode_b64(KEY_SALT)
        .map_err(|e| Error::Encryption(format!("Invalid key salt: {}", e)))?;
    let digest = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Key derivation failed: {}", e)))?
        .hash
        .ok_or_else(|| Error::Encryption("Key derivation produced no output".into()))?;

    Ok(format!(
        "PRAGMA key = 'x\"{}\"';",
        hex::encode(digest.as_bytes())
    ))
}

/// SQLite `CURRENT_TIMESTAMP` text to UTC; unparseable values read as now
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Pooled handle to the category database
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Open an encrypted database keyed by `$BUDGIE_DB_KEY`
    ///
    /// Use [`Database::new_unencrypted`] for development.
    pub fn new(path: &str) -> Result<Self> {
        let passphrase = std::env::var(DB_KEY_ENV).map_err(|_| {
            Error::Encryption(format!(
                "{} is not set. Export a passphrase, or pass --no-encrypt \
                 for a plain database (development only).",
                DB_KEY_ENV
            ))
        })?;
        Self::new_with_key(path, Some(&passphrase))
    }

    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open `path`, encrypted when a passphrase is given
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let mut manager = SqliteConnectionManager::file(path);
        if let Some(passphrase) = passphrase {
            let pragma = key_pragma(passphrase)?;
            manager = manager.with_init(move |conn| conn.execute_batch(&pragma));
        }

        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;
        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.apply_schema()?;

        info!(path, encrypted = passphrase.is_some(), "Category database opened");
        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Fresh database in the temp directory (tests)
    ///
    /// A file rather than `:memory:`: each pooled connection would otherwise
    /// see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(0);

        let name = format!(
            "budgie_test_{}_{}.db",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        );
        let path = std::env::temp_dir().join(name);
        remove_stale(&path);

        Self::new_unencrypted(&path.to_string_lossy())
    }

    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn apply_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        debug!(path = %self.db_path, "Schema applied");
        Ok(())
    }
}

fn remove_stale(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests;
