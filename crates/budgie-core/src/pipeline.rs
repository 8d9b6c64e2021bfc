//! Receipt analysis pipeline
//!
//! Sequences the stages for one batch of photos:
//! OCR per image -> aggregation -> length check -> category snapshot + prompt
//! -> generation -> parsing/validation against the same snapshot.
//!
//! Every stage failure propagates unchanged as an [`ExtractionError`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::ai::{parse_transactions, GenerationClient};
use crate::db::CategoryStore;
use crate::error::{truncate_diagnostic, ExtractionError};
use crate::models::{CandidateTransaction, ReceiptImage};
use crate::ocr::{aggregate, TextExtractor};
use crate::prompts::{build_receipt_prompt, Prompt};

/// Minimum recognized characters before the model is called
pub const DEFAULT_MIN_TEXT_CHARS: usize = 10;

/// Cooperative cancellation, checked between stages
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called
    pub fn checkpoint(&self) -> Result<(), ExtractionError> {
        if self.is_cancelled() {
            Err(ExtractionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Per-call options for [`ReceiptAnalyzer::analyze_with`]
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Reference date for undated transactions (default: today, local time)
    pub today: Option<NaiveDate>,
    pub cancel: Option<CancellationToken>,
}

impl AnalyzeOptions {
    fn checkpoint(&self) -> Result<(), ExtractionError> {
        match &self.cancel {
            Some(token) => token.checkpoint(),
            None => Ok(()),
        }
    }
}

/// The receipt-to-transactions pipeline
pub struct ReceiptAnalyzer {
    extractor: TextExtractor,
    generator: Arc<dyn GenerationClient>,
    store: Arc<dyn CategoryStore>,
    prompt: Prompt,
    min_text_chars: usize,
}

impl ReceiptAnalyzer {
    pub fn new(
        extractor: TextExtractor,
        generator: Arc<dyn GenerationClient>,
        store: Arc<dyn CategoryStore>,
        prompt: Prompt,
    ) -> Self {
        Self {
            extractor,
            generator,
            store,
            prompt,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }

    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    /// Analyze a batch of receipt photos for `user_id`, dated against today
    pub async fn analyze(
        &self,
        images: &[ReceiptImage],
        user_id: i64,
    ) -> Result<Vec<CandidateTransaction>, ExtractionError> {
        self.analyze_with(images, user_id, &AnalyzeOptions::default())
            .await
    }

    /// Analyze with an explicit reference date and/or cancellation token
    pub async fn analyze_with(
        &self,
        images: &[ReceiptImage],
        user_id: i64,
        options: &AnalyzeOptions,
    ) -> Result<Vec<CandidateTransaction>, ExtractionError> {
        let today = options
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        options.checkpoint()?;
        let aggregated = aggregate(&self.extractor, images).await?;

        if aggregated.recognized_chars < self.min_text_chars {
            return Err(ExtractionError::TextTooShort {
                chars: aggregated.recognized_chars,
                min: self.min_text_chars,
            });
        }

        options.checkpoint()?;
        let categories = self
            .store
            .list_categories(user_id)
            .map_err(|e| ExtractionError::CategoryLookup(truncate_diagnostic(&e.to_string())))?;
        let prompt = build_receipt_prompt(&self.prompt, &aggregated.text, today, &categories);
        debug!(
            user_id,
            categories = categories.len(),
            prompt_chars = prompt.chars().count(),
            "Prompt built"
        );

        options.checkpoint()?;
        let response = self.generator.generate(&prompt).await?;

        let names: Vec<String> = categories.into_iter().map(|c| c.name).collect();
        let candidates = parse_transactions(&response, today, &names)?;

        info!(
            user_id,
            images = images.len(),
            transactions = candidates.len(),
            model = self.generator.model(),
            "Receipts analyzed"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockGenerator;
    use crate::db::StaticCategories;
    use crate::error::{Error, Result};
    use crate::models::{Category, TransactionKind};
    use crate::ocr::mock::{png_bytes, StaticRecognizer};
    use crate::ocr::{RecognizerKind, TextRecognizer};
    use crate::prompts::PromptId;

    const CARREFOUR_RESPONSE: &str = r#"```json
{"transactions": [{"merchant": "Carrefour", "date": "2024-05-12", "amount": 23.40, "kind": "expense", "category": "Alimentaire"}]}
```"#;

    struct FailingStore;

    impl CategoryStore for FailingStore {
        fn list_categories(&self, _user_id: i64) -> Result<Vec<Category>> {
            Err(Error::InvalidData("store offline".into()))
        }
    }

    fn store() -> Arc<dyn CategoryStore> {
        let mut categories = StaticCategories::from_names(&["Alimentaire", "Transport"])
            .list_categories(1)
            .unwrap();
        categories[0].keyword_hints = vec!["carrefour".into(), "lidl".into()];
        Arc::new(StaticCategories::new(categories))
    }

    fn extractor(texts: &[&str]) -> TextExtractor {
        let outcomes = texts.iter().map(|t| Ok(t.to_string())).collect();
        let recognizer = StaticRecognizer::scripted(RecognizerKind::Tesseract, outcomes)
            .with_passes(&["fra+eng"]);
        TextExtractor::new(vec![Arc::new(recognizer) as Arc<dyn TextRecognizer>])
    }

    fn analyzer(texts: &[&str], generator: &MockGenerator) -> ReceiptAnalyzer {
        ReceiptAnalyzer::new(
            extractor(texts),
            Arc::new(generator.clone()),
            store(),
            Prompt::embedded(PromptId::AnalyzeReceipts).unwrap(),
        )
    }

    fn images(n: usize) -> Vec<ReceiptImage> {
        (0..n)
            .map(|_| ReceiptImage::new(png_bytes(), Some("image/png")))
            .collect()
    }

    fn options() -> AnalyzeOptions {
        AnalyzeOptions {
            today: NaiveDate::from_ymd_opt(2024, 5, 20),
            cancel: None,
        }
    }

    #[tokio::test]
    async fn test_carrefour_end_to_end() {
        let generator = MockGenerator::new(CARREFOUR_RESPONSE);
        let analyzer = analyzer(&["Carrefour 12/05 23.40"], &generator);

        let result = analyzer
            .analyze_with(&images(1), 1, &options())
            .await
            .unwrap();

        assert_eq!(
            result,
            vec![CandidateTransaction {
                merchant: "Carrefour".into(),
                date: NaiveDate::from_ymd_opt(2024, 5, 12).unwrap(),
                amount: 23.40,
                kind: TransactionKind::Expense,
                category: "Alimentaire".into(),
            }]
        );

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("--- Receipt 1 ---\nCarrefour 12/05 23.40"));
        assert!(prompts[0].contains("  * carrefour, lidl → Alimentaire"));
        assert!(prompts[0].contains("Alimentaire, Transport"));
        assert!(prompts[0].contains("2024-05-20"));
    }

    #[tokio::test]
    async fn test_short_text_never_calls_model() {
        let generator = MockGenerator::new(CARREFOUR_RESPONSE);
        let analyzer = analyzer(&["ABCD"], &generator);

        let result = analyzer.analyze_with(&images(1), 1, &options()).await;
        assert_eq!(result, Err(ExtractionError::TextTooShort { chars: 4, min: 10 }));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_labels_do_not_count_towards_length() {
        let generator = MockGenerator::new(CARREFOUR_RESPONSE);
        // 3 images * 3 chars = 9 recognized characters; labels add many more
        let analyzer = analyzer(&["abc", "def", "ghi"], &generator);
        let result = analyzer.analyze_with(&images(3), 1, &options()).await;
        assert_eq!(result, Err(ExtractionError::TextTooShort { chars: 9, min: 10 }));
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        let generator = MockGenerator::new(CARREFOUR_RESPONSE);
        let analyzer = analyzer(&["ABCD"], &generator).with_min_text_chars(4);
        assert!(analyzer.analyze_with(&images(1), 1, &options()).await.is_ok());
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_multi_image_prompt_keeps_order() {
        let generator = MockGenerator::new(CARREFOUR_RESPONSE);
        let analyzer = analyzer(&["A receipt text", "B receipt text", "C receipt text"], &generator);
        analyzer
            .analyze_with(&images(3), 1, &options())
            .await
            .unwrap();

        let prompt = &generator.prompts()[0];
        let a = prompt.find("--- Receipt 1 ---\nA receipt text").unwrap();
        let b = prompt.find("--- Receipt 2 ---\nB receipt text").unwrap();
        let c = prompt.find("--- Receipt 3 ---\nC receipt text").unwrap();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let generator = MockGenerator::failing(ExtractionError::QuotaExceeded);
        let analyzer = analyzer(&["Carrefour 12/05 23.40"], &generator);
        assert_eq!(
            analyzer.analyze_with(&images(1), 1, &options()).await,
            Err(ExtractionError::QuotaExceeded)
        );
    }

    #[tokio::test]
    async fn test_category_store_failure() {
        let generator = MockGenerator::new(CARREFOUR_RESPONSE);
        let analyzer = ReceiptAnalyzer::new(
            extractor(&["Carrefour 12/05 23.40"]),
            Arc::new(generator.clone()),
            Arc::new(FailingStore),
            Prompt::embedded(PromptId::AnalyzeReceipts).unwrap(),
        );
        match analyzer.analyze_with(&images(1), 1, &options()).await {
            Err(ExtractionError::CategoryLookup(msg)) => assert!(msg.contains("store offline")),
            other => panic!("expected CategoryLookup, got {:?}", other),
        }
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let generator = MockGenerator::new(CARREFOUR_RESPONSE);
        let analyzer = analyzer(&["Carrefour 12/05 23.40"], &generator);
        let token = CancellationToken::new();
        token.cancel();

        let options = AnalyzeOptions {
            cancel: Some(token),
            ..options()
        };
        assert_eq!(
            analyzer.analyze_with(&images(1), 1, &options).await,
            Err(ExtractionError::Cancelled)
        );
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_undated_transactions_use_reference_date() {
        let generator = MockGenerator::new(
            r#"{"transactions": [{"merchant": "Boulangerie", "amount": "3,20", "category": "pain"}]}"#,
        );
        let analyzer = analyzer(&["BOULANGERIE 3,20 EUR"], &generator);
        let result = analyzer
            .analyze_with(&images(1), 1, &options())
            .await
            .unwrap();
        assert_eq!(result[0].date, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
        assert_eq!(result[0].category, "Alimentaire");
        assert_eq!(result[0].amount, 3.20);
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.checkpoint().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.checkpoint(), Err(ExtractionError::Cancelled));
    }
}
