//! Scripted recognizer for testing
//!
//! Lets the extraction chain and the pipeline run without Tesseract or ocrs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::DynamicImage;

use super::{RecognizerError, RecognizerKind, TextRecognizer};

/// Recognizer that replays scripted outcomes
///
/// Outcomes are consumed one per call; the last one repeats once the script
/// runs out. Every call records the language spec it was given.
pub struct StaticRecognizer {
    kind: RecognizerKind,
    passes: Vec<String>,
    script: Mutex<VecDeque<Result<String, RecognizerError>>>,
    last: Mutex<Result<String, RecognizerError>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StaticRecognizer {
    /// Always return `text`
    pub fn text(kind: RecognizerKind, text: &str) -> Self {
        Self::scripted(kind, vec![Ok(text.to_string())])
    }

    /// Replay `outcomes` in order
    pub fn scripted(kind: RecognizerKind, outcomes: Vec<Result<String, RecognizerError>>) -> Self {
        let last = outcomes
            .last()
            .cloned()
            .unwrap_or_else(|| Ok(String::new()));
        Self {
            kind,
            passes: vec!["fra+eng".to_string(), "eng".to_string()],
            script: Mutex::new(outcomes.into()),
            last: Mutex::new(last),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Override the language passes (default `["fra+eng", "eng"]`)
    pub fn with_passes(mut self, passes: &[&str]) -> Self {
        self.passes = passes.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Shared log of the language specs this recognizer was called with
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl TextRecognizer for StaticRecognizer {
    fn kind(&self) -> RecognizerKind {
        self.kind
    }

    fn language_passes(&self) -> &[String] {
        &self.passes
    }

    async fn recognize(
        &self,
        _image: Arc<DynamicImage>,
        languages: &str,
    ) -> Result<String, RecognizerError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(languages.to_string());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(outcome) => {
                *self.last.lock().unwrap_or_else(|e| e.into_inner()) = outcome.clone();
                outcome
            }
            None => self.last.lock().unwrap_or_else(|e| e.into_inner()).clone(),
        }
    }
}

/// A tiny valid PNG, enough for the decoder
#[cfg(test)]
pub(crate) fn png_bytes() -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    DynamicImage::new_rgb8(4, 4)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}
