//! Anthropic Claude provider implementation.
//!
//! The Messages API has no response-schema parameter, so the schema is
//! spelled out in the system prompt and enforced when decoding.

use serde::{Deserialize, Serialize};

use super::{GenerationRequest, ModelPair, TextGenerator, schema_instruction};
use crate::AiError;

/// Anthropic Claude API provider.
pub struct AnthropicProvider {
    api_key: String,
    models: ModelPair,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider.
    #[must_use]
    pub fn new(api_key: String, models: ModelPair) -> Self {
        Self {
            api_key,
            models,
            client: reqwest::Client::new(),
        }
    }
}

/// Anthropic API request body.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Anthropic API response body.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Anthropic API error response.
#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl TextGenerator for AnthropicProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let model = self.models.resolve(&request.model);

        let body = AnthropicRequest {
            model,
            max_tokens: 2048,
            system: schema_instruction(request.schema),
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let err: AnthropicError =
                serde_json::from_str(&text).unwrap_or_else(|_| AnthropicError {
                    error: AnthropicErrorDetail {
                        message: format!("HTTP {status}: {text}"),
                    },
                });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        let response: AnthropicResponse = serde_json::from_str(&text)?;

        let answer: String = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect();

        if answer.is_empty() {
            return Err(AiError::Provider {
                message: "Anthropic returned no text".to_string(),
            });
        }

        Ok(answer)
    }
}
