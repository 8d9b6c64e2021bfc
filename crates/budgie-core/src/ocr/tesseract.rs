//! Tesseract OCR recognizer.
//!
//! Runs the `tesseract` binary on a temporary PNG copy of the decoded image.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tokio::process::Command;
use tracing::debug;

use super::{RecognizerError, RecognizerKind, TextRecognizer};
use crate::config::OcrConfig;

/// Tesseract recognizer.
pub struct TesseractRecognizer {
    binary: PathBuf,
    passes: Vec<String>,
    timeout: Duration,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>, passes: Vec<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            passes,
            timeout,
        }
    }

    /// Bilingual pass first, then the fallback language alone.
    pub fn from_config(binary: impl Into<PathBuf>, config: &OcrConfig) -> Self {
        let mut passes = vec![config.bilingual()];
        if !passes.contains(&config.fallback_language) {
            passes.push(config.fallback_language.clone());
        }
        Self::new(binary, passes, config.timeout)
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::Tesseract
    }

    fn language_passes(&self) -> &[String] {
        &self.passes
    }

    async fn recognize(
        &self,
        image: Arc<DynamicImage>,
        languages: &str,
    ) -> Result<String, RecognizerError> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| RecognizerError::Failed(format!("temp dir: {}", e)))?;
        let image_path = temp_dir.path().join("receipt.png");

        let write_path = image_path.clone();
        tokio::task::spawn_blocking(move || {
            image
                .to_rgb8()
                .save_with_format(&write_path, ImageFormat::Png)
        })
        .await
        .map_err(|e| RecognizerError::Failed(format!("image encoding task: {}", e)))?
        .map_err(|e| RecognizerError::Failed(format!("writing temp image: {}", e)))?;

        debug!(binary = %self.binary.display(), languages, "Running tesseract");

        let mut command = Command::new(&self.binary);
        command
            .arg(&image_path)
            .arg("stdout")
            .args(["-l", languages])
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(RecognizerError::Failed(format!(
                    "tesseract timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RecognizerError::Unavailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Ok(Err(e)) => return Err(RecognizerError::Failed(e.to_string())),
            Ok(Ok(output)) => output,
        };

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RecognizerError::Failed(format!(
                "tesseract failed: {}",
                stderr.trim()
            )))
        }
    }
}
