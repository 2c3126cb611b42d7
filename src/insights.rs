//! AI travel insights via the Gemini generative API
//!
//! A fixed prompt asks for a JSON object with a short narrative and exactly
//! three tips. The reply is untrusted: code fences are stripped, then the
//! remainder must parse strictly into the expected shape.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::PanelConfig;
use crate::models::AiInsights;
use crate::{PanelError, Result, USER_AGENT};

/// Number of quick tips the reply must contain
const TIP_COUNT: usize = 3;

/// Produces the AI-insight portion of the aggregated response
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Generate insights for a place from its encyclopedia summary
    /// (which may be the no-information sentinel).
    async fn insights(&self, place: &str, summary: &str) -> Result<AiInsights>;
}

/// Gemini generateContent client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiReplyContent,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyPart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn new(config: &PanelConfig) -> Result<Self> {
        let api_key = config
            .providers
            .gemini_api_key
            .clone()
            .ok_or_else(|| PanelError::config("Gemini API key is not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.providers.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PanelError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.providers.gemini_base_url.clone(),
            model: config.providers.gemini_model.clone(),
        })
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| PanelError::network(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PanelError::api(format!(
                "Gemini request failed with status {status}: {body}"
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PanelError::api(format!("Failed to parse Gemini response: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| PanelError::api("Gemini reply contained no text"))
    }
}

#[async_trait]
impl InsightGenerator for GeminiClient {
    #[instrument(skip(self, summary))]
    async fn insights(&self, place: &str, summary: &str) -> Result<AiInsights> {
        let reply = self.generate(build_prompt(place, summary)).await?;
        debug!("Raw generative reply: {reply}");
        parse_insights(&reply)
    }
}

/// The fixed instruction template sent to the generative backend
#[must_use]
pub fn build_prompt(place: &str, summary: &str) -> String {
    format!(
        "You are a concise travel assistant. Using the background below, \
         describe {place} for a first-time visitor. Reply with a single JSON \
         object and nothing else, with exactly these fields: \
         \"traveler_summary\" (one short paragraph) and \"quick_tips\" \
         (an array of exactly {TIP_COUNT} short strings).\n\n\
         Place: {place}\n\
         Background: {summary}"
    )
}

/// Strip a markdown code fence wrapping, if present
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

/// Parse a raw generative reply into insights, strictly
pub fn parse_insights(raw: &str) -> Result<AiInsights> {
    let body = strip_code_fences(raw);
    let insights: AiInsights = serde_json::from_str(body).map_err(|e| {
        PanelError::parse(format!("Generative reply is not the expected JSON: {e}"))
    })?;

    if insights.quick_tips.len() != TIP_COUNT {
        return Err(PanelError::parse(format!(
            "Expected exactly {TIP_COUNT} quick tips, got {}",
            insights.quick_tips.len()
        )));
    }

    Ok(insights)
}
