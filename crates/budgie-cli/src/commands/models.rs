//! Gemini model probing

use anyhow::{Context, Result};
use budgie_core::ai::AIClient;
use budgie_core::config::PipelineConfig;
use budgie_core::secrets::CredentialChain;

/// Models tried when none are given
const DEFAULT_PROBE_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.5-pro",
    "gemini-2.0-flash",
];

/// Send the probe prompt to each model and report what the key can reach
pub async fn cmd_models_probe(models: &[String]) -> Result<()> {
    let config = PipelineConfig::load().context("Failed to load pipeline configuration")?;
    let client = AIClient::from_config(&config.generation, &CredentialChain::standard())
        .context("Cannot probe models")?;

    let models: Vec<String> = if models.is_empty() {
        DEFAULT_PROBE_MODELS.iter().map(|m| m.to_string()).collect()
    } else {
        models.to_vec()
    };

    println!("🔍 Probing {} model(s) at {}\n", models.len(), config.generation.base_url);

    let mut reachable = 0;
    for model in &models {
        print!("  {:<28} ", model);
        match client.probe(model).await {
            Ok(reply) => {
                reachable += 1;
                println!("✅ {}", super::truncate(reply.trim(), 40));
            }
            Err(e) => println!("❌ {}", e),
        }
    }

    println!();
    println!("{}/{} model(s) reachable", reachable, models.len());
    if !models.contains(&config.generation.model) {
        println!("Configured model: {}", config.generation.model);
    }

    Ok(())
}
