//! Google Gemini generation client
//!
//! One `generateContent` call per invocation, no retries. Failures are
//! classified into the pipeline's error kinds so the caller can tell quota,
//! auth and missing-model problems apart from everything else.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::GenerationClient;
use crate::config::GenerationConfig;
use crate::error::{truncate_diagnostic, ExtractionError};
use crate::prompts::probe_prompt;

/// Gemini client bound to one model and one API key
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
    /// Canonical status, e.g. "RESOURCE_EXHAUSTED"
    status: Option<String>,
    #[serde(default)]
    details: Vec<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    /// `ErrorInfo` reason, e.g. "API_KEY_INVALID"
    reason: Option<String>,
}

impl GeminiError {
    fn reason(&self) -> Option<&str> {
        self.details.iter().find_map(|d| d.reason.as_deref())
    }
}

impl GeminiClient {
    /// Create a client; the API key must already be resolved
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            timeout: config.timeout,
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Endpoint for the bound model
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Send a trivial prompt to `model` to check the key can reach it
    pub async fn probe(&self, model: &str) -> Result<String, ExtractionError> {
        let prompt = probe_prompt();
        self.with_model(model).generate(&prompt).await
    }

    fn transport_failure(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            ExtractionError::GenerationFailed(format!(
                "request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            ExtractionError::GenerationFailed(truncate_diagnostic(&e.to_string()))
        }
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.1,
                max_output_tokens: 8192,
            },
        };

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Calling Gemini");

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let parsed = serde_json::from_str::<GeminiResponse>(&body);

        if !status.is_success() {
            let error = parsed.ok().and_then(|r| r.error);
            warn!(model = %self.model, status = status.as_u16(), "Gemini request failed");
            return Err(match &error {
                Some(error) => classify_failure(
                    Some(status.as_u16()),
                    error.status.as_deref(),
                    error.reason(),
                    &error.message,
                    &self.model,
                ),
                None => classify_failure(Some(status.as_u16()), None, None, &body, &self.model),
            });
        }

        let parsed = parsed.map_err(|e| {
            ExtractionError::GenerationFailed(truncate_diagnostic(&format!(
                "unreadable Gemini response: {}",
                e
            )))
        })?;

        if let Some(error) = parsed.error {
            return Err(classify_failure(
                None,
                error.status.as_deref(),
                error.reason(),
                &error.message,
                &self.model,
            ));
        }

        let candidate = parsed.candidates.and_then(|c| c.into_iter().next());
        let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());
        let text: String = candidate
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = parsed
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .or(finish_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(ExtractionError::GenerationFailed(truncate_diagnostic(
                &format!("empty response from model ({})", reason),
            )));
        }

        debug!(model = %self.model, response_chars = text.chars().count(), "Gemini responded");
        Ok(text)
    }
}

/// Map an HTTP status, API status and error reason onto the pipeline's
/// error kinds
///
/// A rejected key arrives as HTTP 400 `INVALID_ARGUMENT` with reason
/// `API_KEY_INVALID`, so the reason (or the "API key not valid" message)
/// is checked before the status codes. `message` is otherwise only kept
/// (truncated) for the catch-all `GenerationFailed`.
pub fn classify_failure(
    http_status: Option<u16>,
    api_status: Option<&str>,
    reason: Option<&str>,
    message: &str,
    model: &str,
) -> ExtractionError {
    if matches!(reason, Some("API_KEY_INVALID") | Some("API_KEY_EXPIRED"))
        || message.trim_start().starts_with("API key not valid")
    {
        return ExtractionError::AccessDenied;
    }

    match (http_status, api_status) {
        (Some(429), _) | (_, Some("RESOURCE_EXHAUSTED")) => ExtractionError::QuotaExceeded,
        (Some(401) | Some(403), _) | (_, Some("PERMISSION_DENIED") | Some("UNAUTHENTICATED")) => {
            ExtractionError::AccessDenied
        }
        (Some(404), _) | (_, Some("NOT_FOUND")) => ExtractionError::ModelUnavailable {
            model: model.to_string(),
        },
        (Some(code), _) => {
            ExtractionError::GenerationFailed(truncate_diagnostic(&format!("HTTP {}: {}", code, message)))
        }
        (None, _) => ExtractionError::GenerationFailed(truncate_diagnostic(message)),
    }
}
