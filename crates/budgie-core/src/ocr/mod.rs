//! Text recognition for receipt photos
//!
//! Recognizers form an ordered fallback chain:
//! - Tesseract: local binary, bilingual pass then English only
//! - Ocrs: pure Rust engine (feature `ocr-ocrs`), used when Tesseract is
//!   missing or finds nothing
//!
//! Engine capability is detected once ([`EngineAvailability::detect`]) and the
//! [`TextExtractor`] is built from that snapshot.

mod aggregate;
mod extractor;
pub mod mock;
#[cfg(feature = "ocr-ocrs")]
mod ocrs_backend;
mod tesseract;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

use crate::config::OcrConfig;

pub use aggregate::{aggregate, receipt_label, AggregatedText};
pub use extractor::TextExtractor;
#[cfg(feature = "ocr-ocrs")]
pub use ocrs_backend::OcrsRecognizer;
pub use tesseract::TesseractRecognizer;

/// Files the ocrs engine needs in its model directory
pub const OCRS_MODEL_FILES: &[&str] = &["text-detection.rten", "text-recognition.rten"];

/// Default install location of the Windows Tesseract build
const WINDOWS_TESSERACT: &str = r"C:\Program Files\Tesseract-OCR\tesseract.exe";

/// Available recognition engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerKind {
    /// Tesseract OCR via command-line
    Tesseract,
    /// Pure Rust OCR engine (ocrs crate)
    Ocrs,
}

impl RecognizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Ocrs => "ocrs",
        }
    }
}

impl std::fmt::Display for RecognizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecognizerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "ocrs" => Ok(Self::Ocrs),
            _ => Err(format!("Unknown OCR engine: {}", s)),
        }
    }
}

/// Outcome of a recognition attempt that produced no text
///
/// An empty string is not an error: recognizers return `Ok("")` for that.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecognizerError {
    /// The engine cannot run here; its remaining attempts are skipped
    #[error("engine not available: {0}")]
    Unavailable(String),

    /// This attempt failed; the chain moves on
    #[error("recognition failed: {0}")]
    Failed(String),
}

/// One engine in the fallback chain
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    fn kind(&self) -> RecognizerKind;

    /// Language specs to try in order (e.g., `["fra+eng", "eng"]`)
    fn language_passes(&self) -> &[String];

    /// Recognize text in an already-decoded image
    async fn recognize(
        &self,
        image: Arc<DynamicImage>,
        languages: &str,
    ) -> Result<String, RecognizerError>;
}

/// Which engines can run on this machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineAvailability {
    /// Resolved tesseract binary
    pub tesseract: Option<PathBuf>,
    /// Model directory holding the ocrs models (only with `ocr-ocrs`)
    pub ocrs_models: Option<PathBuf>,
}

impl EngineAvailability {
    /// Probe the machine once
    pub fn detect(config: &OcrConfig) -> Self {
        Self {
            tesseract: find_tesseract(config.tesseract_path.as_deref()),
            ocrs_models: find_ocrs_models(config.model_dir.as_deref()),
        }
    }

    /// Nothing available (useful in tests)
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_available(&self, kind: RecognizerKind) -> bool {
        match kind {
            RecognizerKind::Tesseract => self.tesseract.is_some(),
            RecognizerKind::Ocrs => self.ocrs_models.is_some(),
        }
    }

    pub fn any(&self) -> bool {
        self.tesseract.is_some() || self.ocrs_models.is_some()
    }

    /// What is needed to make an engine available
    pub fn hint(&self, kind: RecognizerKind) -> String {
        match kind {
            RecognizerKind::Tesseract => match &self.tesseract {
                Some(path) => format!("available at {}", path.display()),
                None => "not installed (apt install tesseract-ocr tesseract-ocr-fra, \
                         or set TESSERACT_PATH)"
                    .to_string(),
            },
            RecognizerKind::Ocrs => match &self.ocrs_models {
                Some(dir) => format!("available (models in {})", dir.display()),
                None if cfg!(feature = "ocr-ocrs") => format!(
                    "models missing: put {} in {}",
                    OCRS_MODEL_FILES.join(", "),
                    default_ocrs_model_dir()
                        .map(|d| d.display().to_string())
                        .unwrap_or_else(|| "the ocr.model_dir directory".to_string())
                ),
                None => "not compiled in (build with --features ocr-ocrs)".to_string(),
            },
        }
    }
}

/// Check whether a binary is on PATH
fn check_binary(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn find_tesseract(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.exists().then(|| path.to_path_buf());
    }
    if check_binary("tesseract") {
        return Some(PathBuf::from("tesseract"));
    }
    let windows = Path::new(WINDOWS_TESSERACT);
    if cfg!(windows) && windows.exists() {
        return Some(windows.to_path_buf());
    }
    None
}

/// Default ocrs model directory (~/.local/share/budgie/models/ocrs)
pub fn default_ocrs_model_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("budgie").join("models").join("ocrs"))
}

#[cfg(feature = "ocr-ocrs")]
fn find_ocrs_models(configured: Option<&Path>) -> Option<PathBuf> {
    let dir = configured
        .map(Path::to_path_buf)
        .or_else(default_ocrs_model_dir)?;
    OCRS_MODEL_FILES
        .iter()
        .all(|f| dir.join(f).exists())
        .then_some(dir)
}

#[cfg(not(feature = "ocr-ocrs"))]
fn find_ocrs_models(_configured: Option<&Path>) -> Option<PathBuf> {
    None
}
