//! Analysis request composition and the hosted model client.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisResult, ExtractedText};
use crate::validate::parse_analysis;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Low temperature so repeated analyses of the same contract stay stable.
const ANALYSIS_TEMPERATURE: f32 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 2000;

/// One fully specified call to the hosted model service.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    pub output_schema: Value,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A hosted completion service, answering with the raw text of its reply.
///
/// The requester makes exactly one call per analysis; test doubles implement
/// this trait to stand in for the real service.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<String>;
}

/// OpenRouter-backed [`ModelClient`].
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Build the client from `OPENROUTER_API_KEY` and `OPENROUTER_MODEL`.
    ///
    /// A missing variable is a deployment defect, reported as
    /// [`AnalysisError::Configuration`].
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY").map_err(|_| {
            AnalysisError::Configuration("OPENROUTER_API_KEY is not set".to_string())
        })?;
        let model = std::env::var("OPENROUTER_MODEL")
            .map_err(|_| AnalysisError::Configuration("OPENROUTER_MODEL is not set".to_string()))?;
        Ok(Self::new(api_key, model))
    }
}

#[async_trait]
impl ModelClient for OpenRouterClient {
    async fn generate(&self, request: ModelRequest) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt
                }
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "contract_analysis",
                    "strict": true,
                    "schema": request.output_schema
                }
            }
        });

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| AnalysisError::Upstream(format!("model request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AnalysisError::Upstream(format!(
                "model API request failed: {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Upstream(format!("model response unreadable: {e}")))?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(AnalysisError::EmptyResponse)?;

        Ok(content.to_string())
    }
}

/// Composes analysis requests and guards the model's replies.
pub struct AnalysisRequester {
    model: Arc<dyn ModelClient>,
}

impl AnalysisRequester {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Ask the model for a structured analysis of the extracted contract text.
    ///
    /// Makes at most one upstream call; a failing or empty reply surfaces to
    /// the caller instead of being retried.
    pub async fn analyze(&self, contract_text: &ExtractedText) -> Result<AnalysisResult> {
        let request = ModelRequest {
            prompt: build_prompt(contract_text.as_str()),
            output_schema: analysis_schema(),
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let raw = self.model.generate(request).await?;
        if raw.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        info!("model returned {} characters of analysis", raw.len());
        parse_analysis(&raw)
    }
}

fn build_prompt(contract_text: &str) -> String {
    format!(
        r#"Analyze the following contract text.
Return only valid JSON using this exact shape:
{{
  "summary": "string",
  "risks": ["string"],
  "obligations": ["string"],
  "red_flags": ["string"],
  "section_summaries": [{{"section": "string", "summary": "string"}}]
}}
Do not include markdown or extra keys.

Contract:
{contract_text}"#
    )
}

/// Output schema declared on every analysis request; mirrors the required
/// fields of [`AnalysisResult`]. Declaring it does not remove the need to
/// validate the reply.
fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "risks": { "type": "array", "items": { "type": "string" } },
            "obligations": { "type": "array", "items": { "type": "string" } },
            "red_flags": { "type": "array", "items": { "type": "string" } },
            "section_summaries": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "section": { "type": "string" },
                        "summary": { "type": "string" }
                    },
                    "required": ["section", "summary"]
                }
            }
        },
        "required": ["summary", "risks", "obligations", "red_flags", "section_summaries"]
    })
}
