//! Mock generation client for testing
//!
//! Returns a canned response (or a canned failure) and counts calls, so tests
//! can assert the model was never reached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::GenerationClient;
use crate::error::ExtractionError;

/// Mock generator
#[derive(Clone)]
pub struct MockGenerator {
    model: String,
    outcome: Result<String, ExtractionError>,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockGenerator {
    /// Always answer with `response`
    pub fn new(response: &str) -> Self {
        Self::with_outcome(Ok(response.to_string()))
    }

    /// Always fail with `error`
    pub fn failing(error: ExtractionError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<String, ExtractionError>) -> Self {
        Self {
            model: "mock".to_string(),
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a new instance with a different model name (shares the call log)
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Number of `generate` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[async_trait]
impl GenerationClient for MockGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        self.outcome.clone()
    }
}
