#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Text-generation provider abstraction.
//!
//! Supports Google Gemini, Anthropic Claude, and `OpenAI` (or any
//! `OpenAI`-compatible server via `AI_BASE_URL`) behind the
//! [`providers::TextGenerator`] trait. Every request names the JSON shape
//! the answer must take ([`schema::ResponseSchema`]); answers are decoded
//! strictly against it, so a missing or non-string field is an error rather
//! than an empty string.

pub mod providers;
pub mod schema;

pub use providers::{GenerationRequest, ModelChoice, TextGenerator, create_provider_from_env};
pub use schema::{BriefAnswer, ExtendedAnswer, ResponseSchema};

use thiserror::Error;

/// Errors that can occur during text generation.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The answer does not match the requested schema.
    #[error("Response does not match schema {schema}: {message}")]
    Schema {
        /// Name of the requested schema.
        schema: &'static str,
        /// Description of the mismatch.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
