//! Text-generation providers.
//!
//! Supports Google Gemini, Anthropic Claude, and `OpenAI` via a common
//! trait.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::AiError;
use crate::schema::ResponseSchema;

/// Which model a request should run on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModelChoice {
    /// The provider's main model.
    #[default]
    Default,
    /// The provider's lighter, faster model.
    Light,
    /// A specific model by name.
    Named(String),
}

/// A single-turn generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Model to run on.
    pub model: ModelChoice,
    /// The complete prompt.
    pub prompt: String,
    /// Shape the answer must take.
    pub schema: ResponseSchema,
}

/// Trait for text-generation providers.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Runs the request and returns the raw answer text, which should be a
    /// JSON object matching `request.schema`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider reports an
    /// error.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError>;
}

/// Main and light model names for a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPair {
    /// Model for [`ModelChoice::Default`].
    pub default: String,
    /// Model for [`ModelChoice::Light`].
    pub light: String,
}

impl ModelPair {
    /// Reads `AI_MODEL` / `AI_BRIEF_MODEL`, falling back to the given
    /// provider defaults.
    #[must_use]
    pub fn from_env(default: &str, light: &str) -> Self {
        Self {
            default: std::env::var("AI_MODEL").unwrap_or_else(|_| default.to_string()),
            light: std::env::var("AI_BRIEF_MODEL").unwrap_or_else(|_| light.to_string()),
        }
    }

    /// Resolves a choice to a model name.
    #[must_use]
    pub fn resolve<'a>(&'a self, choice: &'a ModelChoice) -> &'a str {
        match choice {
            ModelChoice::Default => &self.default,
            ModelChoice::Light => &self.light,
            ModelChoice::Named(name) => name,
        }
    }
}

fn api_key(var: &str) -> Result<String, AiError> {
    std::env::var(var).map_err(|_| AiError::Config {
        message: format!("{var} environment variable not set"),
    })
}

/// Creates a text-generation provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `GEMINI_API_KEY` set -> Google Gemini
/// 2. `ANTHROPIC_API_KEY` set -> Anthropic Claude
/// 3. `OPENAI_API_KEY` set -> `OpenAI`
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn TextGenerator>, AiError> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| detect_provider());

    match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let models = ModelPair::from_env("gemini-2.5-flash", "gemini-2.5-flash-lite");
            log::info!("Using Gemini ({} / {})", models.default, models.light);
            Ok(Box::new(gemini::GeminiProvider::new(
                api_key("GEMINI_API_KEY")?,
                models,
            )))
        }
        "anthropic" | "claude" => {
            let models =
                ModelPair::from_env("claude-sonnet-4-20250514", "claude-3-5-haiku-20241022");
            log::info!("Using Anthropic ({} / {})", models.default, models.light);
            Ok(Box::new(anthropic::AnthropicProvider::new(
                api_key("ANTHROPIC_API_KEY")?,
                models,
            )))
        }
        "openai" | "gpt" => {
            let models = ModelPair::from_env("gpt-4o", "gpt-4o-mini");
            let base_url = std::env::var("AI_BASE_URL")
                .unwrap_or_else(|_| openai::DEFAULT_BASE_URL.to_string());
            log::info!(
                "Using OpenAI-compatible API at {base_url} ({} / {})",
                models.default,
                models.light
            );
            // Local servers usually accept any key.
            let key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
            if key.is_empty() && base_url == openai::DEFAULT_BASE_URL {
                return Err(AiError::Config {
                    message: "OPENAI_API_KEY environment variable not set".to_string(),
                });
            }
            Ok(Box::new(openai::OpenAiProvider::new(key, models, base_url)))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'gemini', 'anthropic', or 'openai'."),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name string that matches the arms in
/// [`create_provider_from_env`].
fn detect_provider() -> String {
    if std::env::var("GEMINI_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Gemini (GEMINI_API_KEY found)");
        return "gemini".to_string();
    }

    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return "anthropic".to_string();
    }

    if std::env::var("OPENAI_API_KEY").is_ok() || std::env::var("AI_BASE_URL").is_ok() {
        log::info!("Auto-detected AI provider: OpenAI-compatible");
        return "openai".to_string();
    }

    log::warn!(
        "No AI credentials detected. Set one of: GEMINI_API_KEY, ANTHROPIC_API_KEY, \
         OPENAI_API_KEY. You can also set AI_PROVIDER explicitly."
    );

    // Will produce a clear error about the missing key.
    "gemini".to_string()
}

/// Instruction appended to prompts for providers without native schema
/// enforcement.
fn schema_instruction(schema: ResponseSchema) -> String {
    format!(
        "Respond with only a JSON object matching this JSON Schema, with no other text:\n{}",
        schema.json_schema()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_pair_resolves_choices() {
        let models = ModelPair {
            default: "big".to_string(),
            light: "small".to_string(),
        };
        assert_eq!(models.resolve(&ModelChoice::Default), "big");
        assert_eq!(models.resolve(&ModelChoice::Light), "small");
        assert_eq!(
            models.resolve(&ModelChoice::Named("custom".to_string())),
            "custom"
        );
    }

    #[test]
    fn schema_instruction_embeds_fields() {
        let instruction = schema_instruction(ResponseSchema::Brief);
        assert!(instruction.contains("brief_answer"));
    }
}
