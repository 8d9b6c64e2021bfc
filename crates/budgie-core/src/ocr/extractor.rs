//! Per-image text extraction over the recognizer fallback chain

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info, warn};

use super::{EngineAvailability, RecognizerError, RecognizerKind, TesseractRecognizer, TextRecognizer};
use crate::config::OcrConfig;
use crate::error::{truncate_diagnostic, ExtractionError};

/// Turns one receipt photo into text, trying each recognizer in order
pub struct TextExtractor {
    recognizers: Vec<Arc<dyn TextRecognizer>>,
}

impl TextExtractor {
    pub fn new(recognizers: Vec<Arc<dyn TextRecognizer>>) -> Self {
        Self { recognizers }
    }

    /// Build the chain from configured engine order, keeping only available engines
    pub fn from_config(config: &OcrConfig, availability: &EngineAvailability) -> Self {
        let mut recognizers: Vec<Arc<dyn TextRecognizer>> = Vec::new();

        for kind in &config.engines {
            match kind {
                RecognizerKind::Tesseract => {
                    if let Some(binary) = &availability.tesseract {
                        recognizers.push(Arc::new(TesseractRecognizer::from_config(
                            binary.clone(),
                            config,
                        )));
                    }
                }
                RecognizerKind::Ocrs => {
                    #[cfg(feature = "ocr-ocrs")]
                    if let Some(dir) = &availability.ocrs_models {
                        recognizers.push(Arc::new(super::OcrsRecognizer::from_config(
                            dir.clone(),
                            config,
                        )));
                    }
                }
            }
        }

        info!(
            engines = ?recognizers.iter().map(|r| r.kind()).collect::<Vec<_>>(),
            "OCR fallback chain initialized"
        );

        Self { recognizers }
    }

    /// Engines in the chain, in order
    pub fn engines(&self) -> Vec<RecognizerKind> {
        self.recognizers.iter().map(|r| r.kind()).collect()
    }

    pub fn has_engines(&self) -> bool {
        !self.recognizers.is_empty()
    }

    /// Recognize the text of image `index` (1-based, for error messages)
    ///
    /// Returns trimmed, non-empty text. Each attempt's failure is caught;
    /// only the overall outcome is reported.
    pub async fn extract(&self, index: usize, bytes: &[u8]) -> Result<String, ExtractionError> {
        if self.recognizers.is_empty() {
            return Err(ExtractionError::NoEngineAvailable);
        }

        let image = Arc::new(decode_image(index, bytes).await?);

        let mut saw_empty = false;
        let mut last_failure: Option<String> = None;

        for recognizer in &self.recognizers {
            let kind = recognizer.kind();
            for languages in recognizer.language_passes() {
                match recognizer.recognize(image.clone(), languages).await {
                    Ok(text) => {
                        let text = text.trim();
                        if !text.is_empty() {
                            debug!(
                                image = index,
                                engine = %kind,
                                languages = languages.as_str(),
                                chars = text.chars().count(),
                                "Text recognized"
                            );
                            return Ok(text.to_string());
                        }
                        debug!(image = index, engine = %kind, languages = languages.as_str(), "No text");
                        saw_empty = true;
                    }
                    Err(RecognizerError::Unavailable(reason)) => {
                        debug!(image = index, engine = %kind, "Skipping engine: {}", reason);
                        break;
                    }
                    Err(RecognizerError::Failed(reason)) => {
                        warn!(image = index, engine = %kind, languages = languages.as_str(), "OCR attempt failed: {}", reason);
                        last_failure = Some(format!("{}: {}", kind, reason));
                    }
                }
            }
        }

        if saw_empty {
            Err(ExtractionError::NoTextDetected { index })
        } else if let Some(failure) = last_failure {
            Err(ExtractionError::RecognitionFailed(truncate_diagnostic(
                &failure,
            )))
        } else {
            Err(ExtractionError::NoEngineAvailable)
        }
    }
}

/// Decode off the async executor; the format is sniffed from the bytes
async fn decode_image(index: usize, bytes: &[u8]) -> Result<DynamicImage, ExtractionError> {
    let owned = bytes.to_vec();
    let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&owned))
        .await
        .map_err(|e| ExtractionError::RecognitionFailed(truncate_diagnostic(&e.to_string())))?;

    decoded.map_err(|e| {
        debug!(image = index, "Image decode failed: {}", e);
        ExtractionError::UnreadableImage { index }
    })
}
