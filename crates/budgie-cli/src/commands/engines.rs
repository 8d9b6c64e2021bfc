//! OCR engine availability

use anyhow::{Context, Result};
use budgie_core::config::PipelineConfig;
use budgie_core::ocr::{EngineAvailability, RecognizerKind, TextExtractor};

pub fn cmd_engines() -> Result<()> {
    let config = PipelineConfig::load().context("Failed to load pipeline configuration")?;
    let availability = EngineAvailability::detect(&config.ocr);

    println!("🔎 OCR engines");
    println!();
    for kind in [RecognizerKind::Tesseract, RecognizerKind::Ocrs] {
        let mark = if availability.is_available(kind) {
            "✅"
        } else {
            "❌"
        };
        println!("   {} {:<10} {}", mark, kind, availability.hint(kind));
    }

    let extractor = TextExtractor::from_config(&config.ocr, &availability);
    println!();
    if extractor.has_engines() {
        let chain: Vec<String> = extractor
            .engines()
            .iter()
            .map(|k| k.to_string())
            .collect();
        println!("   Fallback chain: {}", chain.join(" → "));
        println!(
            "   Languages: {} then {}",
            config.ocr.bilingual(),
            config.ocr.fallback_language
        );
    } else {
        println!("   ⚠️  No engine available: 'budgie analyze' will fail until one is installed.");
    }

    Ok(())
}
