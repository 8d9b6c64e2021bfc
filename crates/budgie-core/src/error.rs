//! Error types for Budgie
//!
//! Two layers:
//! - [`Error`]: library-level failures (database, config, IO)
//! - [`ExtractionError`]: the receipt pipeline's terminal failures, each with a
//!   short message that can be shown to the user as-is

use thiserror::Error;

/// Maximum length of diagnostic text carried inside an error
pub const DIAGNOSTIC_LIMIT: usize = 200;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Terminal failures of one receipt analysis
///
/// None of these are retried inside the pipeline. [`ExtractionError::is_retryable`]
/// tells the caller whether offering "try again" makes sense.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Image {index} is unreadable. Use a JPEG or PNG photo.")]
    UnreadableImage { index: usize },

    #[error("No OCR engine available. Install tesseract-ocr or build with the ocr-ocrs feature.")]
    NoEngineAvailable,

    #[error("OCR error: {0}")]
    RecognitionFailed(String),

    #[error("No text detected in image {index}. Retake the photo.")]
    NoTextDetected { index: usize },

    #[error("No text extracted from {attempted} image(s). Check the photo quality.")]
    NoTextExtracted { attempted: usize },

    #[error("Text too short ({chars} characters, need {min}). Retake the photo.")]
    TextTooShort { chars: usize, min: usize },

    #[error("Missing API key. Set GEMINI_API_KEY in the secrets file or .env.")]
    MissingCredential,

    #[error("Gemini quota reached. Try again in a few minutes.")]
    QuotaExceeded,

    #[error("Access denied. Check your API key.")]
    AccessDenied,

    #[error("Model not found: {model}")]
    ModelUnavailable { model: String },

    #[error("API error: {0}")]
    GenerationFailed(String),

    #[error("Invalid AI response. Try again.")]
    InvalidAIResponse,

    #[error("Unexpected AI response format. Try again.")]
    UnexpectedFormat,

    #[error("No transactions detected. Try again with a clearer photo.")]
    NoTransactionsDetected,

    #[error("Could not load categories: {0}")]
    CategoryLookup(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl ExtractionError {
    /// Whether retrying the same request later can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded
                | Self::InvalidAIResponse
                | Self::UnexpectedFormat
                | Self::NoTransactionsDetected
                | Self::NoTextDetected { .. }
                | Self::NoTextExtracted { .. }
                | Self::TextTooShort { .. }
        )
    }
}

/// Cap diagnostic text at [`DIAGNOSTIC_LIMIT`] characters
pub fn truncate_diagnostic(message: &str) -> String {
    let message = message.trim();
    match message.char_indices().nth(DIAGNOSTIC_LIMIT) {
        Some((byte_idx, _)) => format!("{}...", &message[..byte_idx]),
        None => message.to_string(),
    }
}
