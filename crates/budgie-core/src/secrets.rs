//! API credential resolution
//!
//! The Gemini key is looked up in layers, first hit wins:
//! 1. The hosted secret store: a TOML file (`.budgie/secrets.toml`, or the
//!    path in `BUDGIE_SECRETS_FILE`) with a top-level `GEMINI_API_KEY`
//! 2. The process environment (the CLI loads `.env` into it at startup)
//!
//! Nothing here reaches into ambient session state; callers build a chain
//! once and pass the resolved key to the generation client.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ExtractionError;

/// Name of the credential in every layer
pub const API_KEY_NAME: &str = "GEMINI_API_KEY";

/// Environment variable pointing at the secrets file
pub const SECRETS_FILE_ENV: &str = "BUDGIE_SECRETS_FILE";

/// A single place a secret may live
pub trait SecretSource: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &str;

    /// Look up a secret; blank values count as absent
    fn get(&self, key: &str) -> Option<String>;
}

/// Secrets file in TOML form (`KEY = "value"` at top level)
pub struct SecretsFile {
    path: PathBuf,
}

impl SecretsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$BUDGIE_SECRETS_FILE`, else `.budgie/secrets.toml` in the working directory
    pub fn default_location() -> Self {
        let path = std::env::var(SECRETS_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Path::new(".budgie").join("secrets.toml"));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretSource for SecretsFile {
    fn name(&self) -> &str {
        "secrets file"
    }

    fn get(&self, key: &str) -> Option<String> {
        if !self.path.exists() {
            return None;
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.path.display(), "Cannot read secrets file: {}", e);
                return None;
            }
        };
        let table: toml::Table = match toml::from_str(&content) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring malformed secrets file: {}", e);
                return None;
            }
        };
        table
            .get(key)
            .and_then(|v| v.as_str())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Process environment
pub struct EnvironmentSecrets;

impl SecretSource for EnvironmentSecrets {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Ordered chain of secret sources
pub struct CredentialChain {
    sources: Vec<Box<dyn SecretSource>>,
}

impl CredentialChain {
    pub fn new(sources: Vec<Box<dyn SecretSource>>) -> Self {
        Self { sources }
    }

    /// Secrets file first, then environment
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(SecretsFile::default_location()),
            Box::new(EnvironmentSecrets),
        ])
    }

    /// Resolve `GEMINI_API_KEY`, failing with `MissingCredential` when no layer has it
    pub fn resolve_api_key(&self) -> Result<String, ExtractionError> {
        for source in &self.sources {
            if let Some(value) = source.get(API_KEY_NAME) {
                debug!(source = source.name(), "Resolved {}", API_KEY_NAME);
                return Ok(value);
            }
        }
        Err(ExtractionError::MissingCredential)
    }
}

impl Default for CredentialChain {
    fn default() -> Self {
        Self::standard()
    }
}
