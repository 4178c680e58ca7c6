//! Google Gemini provider implementation.

use serde::{Deserialize, Serialize};

use super::{GenerationRequest, ModelPair, TextGenerator};
use crate::AiError;
use crate::schema::ResponseSchema;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Gemini API provider.
pub struct GeminiProvider {
    api_key: String,
    models: ModelPair,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    #[must_use]
    pub fn new(api_key: String, models: ModelPair) -> Self {
        Self {
            api_key,
            models,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Gemini's `OpenAPI`-subset schema dialect (upper-case type names, no
/// `additionalProperties`).
fn gemini_schema(schema: ResponseSchema) -> serde_json::Value {
    let properties: serde_json::Map<String, serde_json::Value> = schema
        .fields()
        .iter()
        .map(|f| ((*f).to_string(), serde_json::json!({ "type": "STRING" })))
        .collect();

    serde_json::json!({
        "type": "OBJECT",
        "properties": properties,
        "required": schema.fields(),
    })
}

#[async_trait::async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let model = self.models.resolve(&request.model);

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: gemini_schema(request.schema),
            },
        };

        log::debug!("Gemini request: model={model} schema={}", request.schema.name());

        let resp = self
            .client
            .post(format!("{API_BASE}/{model}:generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let err: GeminiError = serde_json::from_str(&text).unwrap_or_else(|_| GeminiError {
                error: GeminiErrorDetail {
                    message: format!("HTTP {status}: {text}"),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        let response: GeminiResponse = serde_json::from_str(&text)?;

        let answer: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(AiError::Provider {
                message: "Gemini returned no text".to_string(),
            });
        }

        Ok(answer)
    }
}
