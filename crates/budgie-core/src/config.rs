//! Pipeline configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/budgie/config/pipeline.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! A few environment variables win over both layers:
//! - `BUDGIE_MODEL`: generation model name
//! - `TESSERACT_PATH`: explicit path to the tesseract binary

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ocr::RecognizerKind;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/pipeline.toml");

/// Generation model pinned when nothing else is configured
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Public Gemini endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Settings for the hosted generation model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationConfig {
    pub model: String,
    pub base_url: String,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Settings for text recognition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrConfig {
    /// Tesseract code of the receipts' language (e.g., "fra")
    pub primary_language: String,
    /// Tesseract code tried alone when the bilingual pass finds nothing
    pub fallback_language: String,
    /// Engines tried in order
    pub engines: Vec<RecognizerKind>,
    /// Explicit tesseract binary (skips PATH probing)
    pub tesseract_path: Option<PathBuf>,
    /// Directory holding ocrs model files
    pub model_dir: Option<PathBuf>,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl OcrConfig {
    /// Tesseract language spec for the bilingual pass ("fra+eng")
    pub fn bilingual(&self) -> String {
        if self.primary_language == self.fallback_language {
            self.primary_language.clone()
        } else {
            format!("{}+{}", self.primary_language, self.fallback_language)
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            primary_language: "fra".to_string(),
            fallback_language: "eng".to_string(),
            engines: vec![RecognizerKind::Tesseract, RecognizerKind::Ocrs],
            tesseract_path: None,
            model_dir: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub generation: GenerationConfig,
    pub ocr: OcrConfig,
    /// Minimum recognized characters before the model is called
    pub min_text_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            ocr: OcrConfig::default(),
            min_text_chars: 10,
        }
    }
}

impl PipelineConfig {
    /// Load from the default override location, else the embedded defaults,
    /// then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = load_config(default_config_path().as_deref())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit file (falls back to embedded defaults if missing)
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = load_config(Some(path))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Embedded defaults only (no disk, no environment)
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(model) = non_empty_env("BUDGIE_MODEL") {
            self.generation.model = model;
        }
        if let Some(path) = non_empty_env("TESSERACT_PATH") {
            self.ocr.tesseract_path = Some(PathBuf::from(path));
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("budgie").join("config").join("pipeline.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<PipelineConfig> {
    let content = match override_path {
        Some(path) if path.exists() => fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    generation: Option<RawGeneration>,
    ocr: Option<RawOcr>,
    pipeline: Option<RawPipeline>,
}

#[derive(Debug, Deserialize)]
struct RawGeneration {
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawOcr {
    primary_language: Option<String>,
    fallback_language: Option<String>,
    engines: Option<Vec<String>>,
    tesseract_path: Option<PathBuf>,
    model_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawPipeline {
    min_text_chars: Option<usize>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<PipelineConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    let mut config = PipelineConfig::default();

    if let Some(generation) = raw.generation {
        if let Some(model) = generation.model {
            config.generation.model = model;
        }
        if let Some(base_url) = generation.base_url {
            config.generation.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = generation.timeout_secs {
            config.generation.timeout = Duration::from_secs(timeout);
        }
    }

    if let Some(ocr) = raw.ocr {
        if let Some(lang) = ocr.primary_language {
            config.ocr.primary_language = lang;
        }
        if let Some(lang) = ocr.fallback_language {
            config.ocr.fallback_language = lang;
        }
        if let Some(engines) = ocr.engines {
            let mut kinds = Vec::new();
            for name in engines {
                let kind = name.parse::<RecognizerKind>().map_err(Error::Config)?;
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            config.ocr.engines = kinds;
        }
        config.ocr.tesseract_path = ocr.tesseract_path;
        config.ocr.model_dir = ocr.model_dir;
        if let Some(timeout) = ocr.timeout_secs {
            config.ocr.timeout = Duration::from_secs(timeout);
        }
    }

    if let Some(pipeline) = raw.pipeline {
        if let Some(min) = pipeline.min_text_chars {
            config.min_text_chars = min;
        }
    }

    Ok(config)
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}
