//! `OpenAI` provider implementation.
//!
//! Uses structured outputs (`response_format: json_schema`), which most
//! `OpenAI`-compatible servers also understand.

use serde::{Deserialize, Serialize};

use super::{GenerationRequest, ModelPair, TextGenerator};
use crate::AiError;

/// Base URL of the hosted `OpenAI` API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    models: ModelPair,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider talking to `base_url`.
    #[must_use]
    pub fn new(api_key: String, models: ModelPair, base_url: String) -> Self {
        Self {
            api_key,
            models,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    response_format: serde_json::Value,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let model = self.models.resolve(&request.model);

        let body = OpenAiRequest {
            model,
            messages: vec![OpenAiMessage {
                role: "user",
                content: &request.prompt,
            }],
            response_format: serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema.name(),
                    "strict": true,
                    "schema": request.schema.json_schema(),
                },
            }),
            max_tokens: 2048,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let resp = builder.send().await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let err: OpenAiError = serde_json::from_str(&text).unwrap_or_else(|_| OpenAiError {
                error: OpenAiErrorDetail {
                    message: format!("HTTP {status}: {text}"),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        let response: OpenAiResponse = serde_json::from_str(&text)?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AiError::Provider {
                message: "OpenAI returned no choices".to_string(),
            })?;

        if let Some(refusal) = message.refusal {
            return Err(AiError::Provider {
                message: format!("Model refused: {refusal}"),
            });
        }

        message.content.ok_or_else(|| AiError::Provider {
            message: "OpenAI returned no content".to_string(),
        })
    }
}
