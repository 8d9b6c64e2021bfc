//! Ocrs recognizer.
//!
//! Pure Rust OCR, no external binaries. Models are loaded once per process
//! from the model directory found by [`super::EngineAvailability::detect`].

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;

use super::{RecognizerError, RecognizerKind, TextRecognizer};
use crate::config::OcrConfig;

/// Global cached OcrEngine instance (initialized once, reused for all OCR calls).
/// OcrEngine is Send+Sync and its methods take &self, so no Mutex needed.
static OCR_ENGINE: OnceLock<ocrs::OcrEngine> = OnceLock::new();

/// Ocrs recognizer (pure Rust).
pub struct OcrsRecognizer {
    model_dir: PathBuf,
    passes: Vec<String>,
    timeout: Duration,
}

impl OcrsRecognizer {
    /// The models are language-agnostic, so there is a single pass.
    pub fn from_config(model_dir: impl Into<PathBuf>, config: &OcrConfig) -> Self {
        Self {
            model_dir: model_dir.into(),
            passes: vec![config.bilingual()],
            timeout: config.timeout,
        }
    }
}

/// Get or initialize the cached OCR engine.
fn get_or_init_engine(model_dir: &std::path::Path) -> Result<&'static ocrs::OcrEngine, RecognizerError> {
    if let Some(engine) = OCR_ENGINE.get() {
        return Ok(engine);
    }

    let detection_path = model_dir.join("text-detection.rten");
    let recognition_path = model_dir.join("text-recognition.rten");

    let detection_model = rten::Model::load_file(&detection_path).map_err(|e| {
        RecognizerError::Unavailable(format!("Failed to load detection model: {}", e))
    })?;
    let recognition_model = rten::Model::load_file(&recognition_path).map_err(|e| {
        RecognizerError::Unavailable(format!("Failed to load recognition model: {}", e))
    })?;

    let engine = ocrs::OcrEngine::new(ocrs::OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })
    .map_err(|e| RecognizerError::Unavailable(format!("Failed to create OCR engine: {}", e)))?;

    // Another thread may have won the race; either engine is fine
    let _ = OCR_ENGINE.set(engine);

    OCR_ENGINE
        .get()
        .ok_or_else(|| RecognizerError::Failed("Failed to cache OCR engine".to_string()))
}

fn run_ocrs(model_dir: &std::path::Path, image: &DynamicImage) -> Result<String, RecognizerError> {
    let engine = get_or_init_engine(model_dir)?;

    let rgb_img = image.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    let img_source = ocrs::ImageSource::from_bytes(rgb_img.as_raw(), (width, height))
        .map_err(|e| RecognizerError::Failed(format!("Failed to convert image: {}", e)))?;

    let input = engine
        .prepare_input(img_source)
        .map_err(|e| RecognizerError::Failed(format!("Failed to prepare input: {}", e)))?;

    engine
        .get_text(&input)
        .map_err(|e| RecognizerError::Failed(format!("Failed to extract text: {}", e)))
}

#[async_trait]
impl TextRecognizer for OcrsRecognizer {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::Ocrs
    }

    fn language_passes(&self) -> &[String] {
        &self.passes
    }

    async fn recognize(
        &self,
        image: Arc<DynamicImage>,
        _languages: &str,
    ) -> Result<String, RecognizerError> {
        let model_dir = self.model_dir.clone();
        let task = tokio::task::spawn_blocking(move || run_ocrs(&model_dir, &image));

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(RecognizerError::Failed(format!(
                "ocrs timed out after {}s",
                self.timeout.as_secs()
            ))),
            Ok(Err(e)) => Err(RecognizerError::Failed(format!("ocrs task: {}", e))),
            Ok(Ok(result)) => result,
        }
    }
}
