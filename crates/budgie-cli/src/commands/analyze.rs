//! Receipt analysis command

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use budgie_core::ai::{AIClient, GenerationClient};
use budgie_core::config::PipelineConfig;
use budgie_core::ocr::{EngineAvailability, TextExtractor};
use budgie_core::pipeline::{AnalyzeOptions, CancellationToken, ReceiptAnalyzer};
use budgie_core::prompts::{PromptId, PromptLibrary};
use budgie_core::secrets::CredentialChain;
use budgie_core::{CandidateTransaction, ExtractionError, ReceiptImage, TransactionKind};
use chrono::NaiveDate;

use super::{open_db, truncate};

/// Analyze receipt photos and print the candidate transactions
pub async fn cmd_analyze(
    db_path: &Path,
    user_id: i64,
    files: &[PathBuf],
    date: Option<&str>,
    json: bool,
    model: Option<&str>,
    no_encrypt: bool,
) -> Result<()> {
    let today = parse_reference_date(date)?;
    let images = read_images(files)?;

    let mut config = PipelineConfig::load().context("Failed to load pipeline configuration")?;
    if let Some(model) = model {
        config.generation.model = model.to_string();
    }

    // Credentials first so a missing key fails before any OCR work
    let client = AIClient::from_config(&config.generation, &CredentialChain::standard())?;

    let db = open_db(db_path, no_encrypt)?;
    if db.ensure_user_has_categories(user_id)? {
        tracing::info!(user_id, "Seeded default categories");
    }

    let availability = EngineAvailability::detect(&config.ocr);
    let extractor = TextExtractor::from_config(&config.ocr, &availability);

    let mut library = PromptLibrary::new();
    let prompt = library.get(PromptId::AnalyzeReceipts)?.clone();

    if !json {
        println!(
            "🧾 Analyzing {} receipt(s) with {}...",
            images.len(),
            client.model()
        );
    }

    let analyzer = ReceiptAnalyzer::new(extractor, Arc::new(client), Arc::new(db), prompt)
        .with_min_text_chars(config.min_text_chars);

    let cancel = CancellationToken::new();
    let options = AnalyzeOptions {
        today,
        cancel: Some(cancel.clone()),
    };

    let ctrl_c = async {
        // No handler means no interrupt, not an immediate one
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let analysis = analyzer.analyze_with(&images, user_id, &options);

    let candidates = match run_until_interrupted(analysis, ctrl_c, &cancel).await {
        Ok(candidates) => candidates,
        Err(e) => {
            if !json && e.is_retryable() {
                eprintln!("💡 This may succeed if you try again.");
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else {
        print_candidates(&candidates);
    }

    Ok(())
}

/// Drive `work` to completion unless `interrupt` fires first
///
/// An interrupt trips `cancel` and drops `work` mid-flight, including an
/// in-progress Gemini request, so nothing is printed afterwards.
pub async fn run_until_interrupted<T>(
    work: impl Future<Output = Result<T, ExtractionError>>,
    interrupt: impl Future<Output = ()>,
    cancel: &CancellationToken,
) -> Result<T, ExtractionError> {
    tokio::select! {
        result = work => {
            cancel.checkpoint()?;
            result
        }
        () = interrupt => {
            cancel.cancel();
            tracing::info!("Analysis interrupted");
            Err(ExtractionError::Cancelled)
        }
    }
}

/// `--date` as a reference date (None means today)
pub fn parse_reference_date(date: Option<&str>) -> Result<Option<NaiveDate>> {
    date.map(|d| {
        NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid --date '{}', expected YYYY-MM-DD", d))
    })
    .transpose()
}

/// MIME hint from the file extension
pub fn mime_hint(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

fn read_images(files: &[PathBuf]) -> Result<Vec<ReceiptImage>> {
    files
        .iter()
        .map(|file| {
            let bytes = std::fs::read(file)
                .with_context(|| format!("Failed to read receipt {}", file.display()))?;
            Ok(ReceiptImage::new(bytes, mime_hint(file)))
        })
        .collect()
}

fn print_candidates(candidates: &[CandidateTransaction]) {
    println!();
    println!(
        "{:<10}  {:<28} {:>10}  {:<7}  CATEGORY",
        "DATE", "MERCHANT", "AMOUNT", "KIND"
    );
    println!("{}", "-".repeat(75));

    for tx in candidates {
        println!(
            "{:<10}  {:<28} {:>10.2}  {:<7}  {}",
            tx.date.to_string(),
            truncate(&tx.merchant, 28),
            tx.amount,
            tx.kind.as_str(),
            tx.category
        );
    }

    let (expenses, income) = totals(candidates);
    println!();
    println!(
        "{} candidate(s): {:.2} expenses, {:.2} income",
        candidates.len(),
        expenses,
        income
    );
    println!("Review before saving: nothing has been recorded.");
}

/// (expense total, income total)
pub fn totals(candidates: &[CandidateTransaction]) -> (f64, f64) {
    candidates
        .iter()
        .fold((0.0, 0.0), |(expenses, income), tx| match tx.kind {
            TransactionKind::Expense => (expenses + tx.amount, income),
            TransactionKind::Income => (expenses, income + tx.amount),
        })
}
