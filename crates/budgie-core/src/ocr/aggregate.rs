//! Multi-image aggregation with provenance labels

use tracing::{info, warn};

use super::TextExtractor;
use crate::error::ExtractionError;
use crate::models::ReceiptImage;

/// Concatenated OCR text of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedText {
    /// Labelled blocks joined by a blank line
    pub text: String,
    /// Recognized characters, labels and separators excluded
    pub recognized_chars: usize,
    /// 1-based indices of the images that contributed text
    pub included: Vec<usize>,
}

/// Provenance label for image `index` (1-based)
pub fn receipt_label(index: usize) -> String {
    format!("--- Receipt {} ---", index)
}

/// Run text extraction over every image, in order
///
/// A failing image is logged and left out; its number is skipped in the
/// labels. `NoEngineAvailable` aborts the whole batch.
pub async fn aggregate(
    extractor: &TextExtractor,
    images: &[ReceiptImage],
) -> Result<AggregatedText, ExtractionError> {
    let mut blocks = Vec::with_capacity(images.len());
    let mut recognized_chars = 0;
    let mut included = Vec::new();

    for (i, image) in images.iter().enumerate() {
        let index = i + 1;
        match extractor.extract(index, &image.bytes).await {
            Ok(text) => {
                recognized_chars += text.chars().count();
                blocks.push(format!("{}\n{}", receipt_label(index), text));
                included.push(index);
            }
            Err(ExtractionError::NoEngineAvailable) => {
                return Err(ExtractionError::NoEngineAvailable);
            }
            Err(e) => {
                warn!(image = index, mime = ?image.mime_type, "Skipping image: {}", e);
            }
        }
    }

    if blocks.is_empty() {
        return Err(ExtractionError::NoTextExtracted {
            attempted: images.len(),
        });
    }

    info!(
        images = images.len(),
        included = included.len(),
        chars = recognized_chars,
        "OCR text aggregated"
    );

    Ok(AggregatedText {
        text: blocks.join("\n\n"),
        recognized_chars,
        included,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ocr::mock::{png_bytes, StaticRecognizer};
    use crate::ocr::{RecognizerError, RecognizerKind, TextRecognizer};

    fn receipt() -> ReceiptImage {
        ReceiptImage::new(png_bytes(), Some("image/png"))
    }

    fn scripted(outcomes: Vec<Result<String, RecognizerError>>) -> TextExtractor {
        // One pass per image keeps the script aligned with the images
        let recognizer = StaticRecognizer::scripted(RecognizerKind::Tesseract, outcomes)
            .with_passes(&["fra+eng"]);
        TextExtractor::new(vec![Arc::new(recognizer) as Arc<dyn TextRecognizer>])
    }

    #[tokio::test]
    async fn test_labels_follow_input_order() {
        let extractor = scripted(vec![Ok("CARREFOUR 23.40".into()), Ok("SNCF 45.00".into())]);
        let result = aggregate(&extractor, &[receipt(), receipt()]).await.unwrap();

        assert_eq!(
            result.text,
            "--- Receipt 1 ---\nCARREFOUR 23.40\n\n--- Receipt 2 ---\nSNCF 45.00"
        );
        assert_eq!(result.included, vec![1, 2]);
        assert_eq!(result.recognized_chars, "CARREFOUR 23.40".len() + "SNCF 45.00".len());
    }

    #[tokio::test]
    async fn test_failed_image_leaves_gap() {
        let extractor = scripted(vec![
            Ok("LIDL 4.99".into()),
            Ok(String::new()),
            Ok("FNAC 19.99".into()),
        ]);
        let result = aggregate(&extractor, &[receipt(), receipt(), receipt()])
            .await
            .unwrap();

        assert!(result.text.contains("--- Receipt 1 ---\nLIDL 4.99"));
        assert!(!result.text.contains("--- Receipt 2 ---"));
        assert!(result.text.contains("--- Receipt 3 ---\nFNAC 19.99"));
        assert_eq!(result.included, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_unreadable_image_is_skipped() {
        let extractor = scripted(vec![Ok("PHARMACIE 8.50".into())]);
        let garbage = ReceiptImage::new(b"not an image".to_vec(), Some("image/jpeg"));
        let result = aggregate(&extractor, &[garbage, receipt()]).await.unwrap();
        assert_eq!(result.text, "--- Receipt 2 ---\nPHARMACIE 8.50");
    }

    #[tokio::test]
    async fn test_nothing_extracted() {
        let extractor = scripted(vec![Ok(String::new())]);
        assert_eq!(
            aggregate(&extractor, &[receipt(), receipt()]).await,
            Err(ExtractionError::NoTextExtracted { attempted: 2 })
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let extractor = scripted(vec![Ok("x".into())]);
        assert_eq!(
            aggregate(&extractor, &[]).await,
            Err(ExtractionError::NoTextExtracted { attempted: 0 })
        );
    }

    #[tokio::test]
    async fn test_no_engine_aborts_batch() {
        let extractor = TextExtractor::new(Vec::new());
        assert_eq!(
            aggregate(&extractor, &[receipt()]).await,
            Err(ExtractionError::NoEngineAvailable)
        );
    }
}
