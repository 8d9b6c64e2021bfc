//! Budgie Core Library
//!
//! Turns photos of receipts into candidate expense/income transactions:
//! - OCR with an engine fallback chain (Tesseract, then ocrs)
//! - Multi-image aggregation into one labelled text
//! - Prompt library with user overrides
//! - Gemini generation client with failure classification
//! - Response parsing, validation and category resolution
//! - Per-user category store (SQLite/SQLCipher)

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod prompts;
pub mod secrets;

/// Test utilities including mock Gemini server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIClient, GeminiClient, GenerationClient, MockGenerator};
pub use config::{GenerationConfig, OcrConfig, PipelineConfig};
pub use db::{CategoryStore, Database, StaticCategories};
pub use error::{Error, ExtractionError, Result};
pub use models::{CandidateTransaction, Category, NewCategory, ReceiptImage, TransactionKind};
pub use ocr::{EngineAvailability, RecognizerKind, TextExtractor};
pub use pipeline::{AnalyzeOptions, CancellationToken, ReceiptAnalyzer};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use secrets::CredentialChain;
