//! Google Gemini advisory provider.
//!
//! This module provides the [`GeminiProvider`] which implements the
//! [`AdvisoryProvider`] trait for Google's Gemini API (<https://ai.google.dev/>).

use std::time::Duration;

use super::{AdvisoryProvider, GuidanceRequest};
use anyhow::{Result, anyhow, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/";

const MODEL: &str = "gemini-flash-lite-latest";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const GUIDANCE_TEMPERATURE: f32 = 0.3;
const GUIDANCE_MAX_TOKENS: u32 = 800;

/// Log lines beyond this many are summarized as a count in the prompt.
const MAX_PROMPT_LOG_LINES: usize = 40;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [UserTurn<'a>; 1],
    generation_config: SamplingParams,
}

#[derive(Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    parts: [PromptText<'a>; 1],
}

#[derive(Serialize)]
struct PromptText<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SamplingParams {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ReplyText>>,
}

#[derive(Deserialize)]
struct ReplyText {
    text: String,
}

impl GeminiResponse {
    /// Text of the first candidate, joined across parts. `None` when the
    /// response is empty or was blocked by a safety filter.
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates?.into_iter().next()?;
        if let Some(reason) = &candidate.finish_reason
            && (reason == "SAFETY" || reason == "BLOCKED")
        {
            return None;
        }
        let parts = candidate.content?.parts?;
        let text: Vec<String> = parts.into_iter().map(|p| p.text).collect();
        let text = text.join("").trim().to_string();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Google Gemini provider producing cleaning guidance.
///
/// ```rust,ignore
/// use insight_processing::ai::GeminiProvider;
///
/// let provider = GeminiProvider::new(std::env::var("GEMINI_API_KEY")?)?;
/// ```
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    /// Provider for the public Gemini endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Provider for a proxy or other Gemini-compatible endpoint. `base_url`
    /// is the prefix the model name is appended to.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client,
        })
    }

    fn build_guidance_prompt(&self, request: &GuidanceRequest) -> String {
        let summary = &request.summary;
        let mut prompt = format!(
            "You are a business data analyst. A dataset was cleaned automatically.\n\n\
            FILE: {}\n\
            DATA DOMAIN: {}\n\
            SHAPE: {} rows x {} columns before, {} rows x {} columns after\n\n\
            COLUMN ROLES:\n",
            request.filename,
            request.domain,
            summary.original_shape.0,
            summary.original_shape.1,
            summary.final_shape.0,
            summary.final_shape.1,
        );

        for (column, role) in &request.roles {
            prompt.push_str(&format!("- {}: {}\n", column, role));
        }

        push_section(&mut prompt, "ISSUES FOUND", &request.issues_found);
        push_section(&mut prompt, "ACTIONS TAKEN", &request.actions_taken);

        prompt.push_str(&format!(
            "\nSAMPLE OF CLEANED DATA:\n{}\n\n\
            Write 3 to 5 short bullet points telling a business user what to double-check \
            in this data before drawing conclusions. Plain text only.",
            request.sample_data
        ));

        prompt
    }

    fn call_api(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: [UserTurn {
                role: "user",
                parts: [PromptText { text: prompt }],
            }],
            generation_config: SamplingParams {
                temperature: GUIDANCE_TEMPERATURE,
                max_output_tokens: GUIDANCE_MAX_TOKENS,
            },
        };
        let url = format!("{}{}:generateContent?key={}", self.base_url, MODEL, self.api_key);

        let response = self.client.post(&url).json(&body).send()?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            bail!("Gemini returned {}: {}", status, detail);
        }

        let reply: GeminiResponse = response.json()?;
        reply
            .into_text()
            .ok_or_else(|| anyhow!("Gemini returned no guidance text"))
    }
}

fn push_section(prompt: &mut String, heading: &str, lines: &[String]) {
    prompt.push_str(&format!("\n{}:\n", heading));
    if lines.is_empty() {
        prompt.push_str("- none\n");
        return;
    }
    for line in lines.iter().take(MAX_PROMPT_LOG_LINES) {
        prompt.push_str(&format!("- {}\n", line));
    }
    if lines.len() > MAX_PROMPT_LOG_LINES {
        prompt.push_str(&format!("- ... and {} more\n", lines.len() - MAX_PROMPT_LOG_LINES));
    }
}

impl AdvisoryProvider for GeminiProvider {
    fn cleaning_guidance(&self, request: &GuidanceRequest) -> Result<String> {
        let prompt = self.build_guidance_prompt(request);
        debug!("Requesting guidance from {} ({} chars)", MODEL, prompt.len());
        self.call_api(&prompt)
    }

    fn name(&self) -> &str {
        "Gemini"
    }

    fn model(&self) -> Option<&str> {
        Some(MODEL)
    }
}

// ============================================================================
// Tests
// ============================================================================
