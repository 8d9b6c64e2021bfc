//! Configuration display

use anyhow::{Context, Result};
use budgie_core::config::{default_config_path, PipelineConfig};

/// Print the effective configuration (override file or defaults, plus env)
pub fn cmd_config() -> Result<()> {
    let config = PipelineConfig::load().context("Failed to load pipeline configuration")?;

    let source = match default_config_path() {
        Some(path) if path.exists() => format!("override ({})", path.display()),
        Some(path) => format!("embedded defaults (override path: {})", path.display()),
        None => "embedded defaults".to_string(),
    };

    println!("⚙️  Pipeline configuration");
    println!("   Source: {}", source);
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
