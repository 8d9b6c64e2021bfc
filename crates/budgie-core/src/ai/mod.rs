//! Hosted generation model abstraction
//!
//! # Architecture
//!
//! - `GenerationClient` trait: prompt in, raw response text out
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Implementations: `GeminiClient`, `MockGenerator`
//! - `parsing`: turns the raw response into validated candidates
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = PipelineConfig::load()?;
//! let ai = AIClient::from_config(&config.generation, &CredentialChain::standard())?;
//! let raw = ai.generate(&prompt).await?;
//! ```

pub mod gemini;
mod mock;
pub mod parsing;

pub use gemini::{classify_failure, GeminiClient};
pub use mock::MockGenerator;
pub use parsing::{closest_category, parse_transactions, resolve_category, strip_code_fence};

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::ExtractionError;
use crate::prompts::probe_prompt;
use crate::secrets::CredentialChain;

/// Interface to a hosted generative model
///
/// One attempt per call; implementations never retry.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Model the client is bound to
    fn model(&self) -> &str;

    /// Send `prompt` and return the model's raw text
    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError>;
}

/// Concrete generation client
#[derive(Clone)]
pub enum AIClient {
    /// Google Gemini (`generateContent`)
    Gemini(GeminiClient),
    /// Mock client for testing
    Mock(MockGenerator),
}

impl AIClient {
    /// Resolve the API key and build a Gemini client
    ///
    /// Fails with `MissingCredential` before any network or OCR work.
    pub fn from_config(
        config: &GenerationConfig,
        credentials: &CredentialChain,
    ) -> Result<Self, ExtractionError> {
        let api_key = credentials.resolve_api_key()?;
        Ok(Self::gemini(config, api_key))
    }

    /// Create a Gemini client with an explicit key
    pub fn gemini(config: &GenerationConfig, api_key: impl Into<String>) -> Self {
        AIClient::Gemini(GeminiClient::new(config, api_key))
    }

    /// Create a mock client answering `response`
    pub fn mock(response: &str) -> Self {
        AIClient::Mock(MockGenerator::new(response))
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Gemini(c) => AIClient::Gemini(c.with_model(model)),
            AIClient::Mock(m) => AIClient::Mock(m.with_model(model)),
        }
    }

    /// Check that `model` answers a trivial prompt with this client's key
    pub async fn probe(&self, model: &str) -> Result<String, ExtractionError> {
        match self {
            AIClient::Gemini(c) => c.probe(model).await,
            AIClient::Mock(m) => m.with_model(model).generate(&probe_prompt()).await,
        }
    }
}

#[async_trait]
impl GenerationClient for AIClient {
    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(c) => c.model(),
            AIClient::Mock(m) => m.model(),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        match self {
            AIClient::Gemini(c) => c.generate(prompt).await,
            AIClient::Mock(m) => m.generate(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretsFile;

    #[test]
    fn test_from_config_requires_credential() {
        let dir = tempfile::tempdir().unwrap();
        let chain = CredentialChain::new(vec![Box::new(SecretsFile::new(
            dir.path().join("secrets.toml"),
        ))]);
        let result = AIClient::from_config(&GenerationConfig::default(), &chain);
        assert!(matches!(result, Err(ExtractionError::MissingCredential)));
    }

    #[test]
    fn test_from_config_with_secrets_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "GEMINI_API_KEY = \"abc\"\n").unwrap();
        let chain = CredentialChain::new(vec![Box::new(SecretsFile::new(&path))]);

        let client = AIClient::from_config(&GenerationConfig::default(), &chain).unwrap();
        assert_eq!(client.model(), "gemini-2.5-flash");
        assert_eq!(client.with_model("gemini-2.5-pro").model(), "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn test_mock_probe_uses_probe_prompt() {
        let mock = MockGenerator::new("OK");
        let client = AIClient::Mock(mock.clone());
        assert_eq!(client.probe("gemini-2.0-flash-lite").await.unwrap(), "OK");
        assert_eq!(mock.call_count(), 1);
        assert!(mock.prompts()[0].contains("OK"));
    }
}
