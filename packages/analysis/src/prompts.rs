//! Compile-time registry of prompt templates.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! A template describes the statistics, asks for an interpretation, then
//! asks for a forecast. The statistics themselves are appended as JSON when
//! a prompt is rendered.

use std::collections::BTreeMap;

use problem_map_analytics_models::{CityStats, ScopeStats};
use problem_map_problem_models::Scope;
use serde::Deserialize;

/// Embedded TOML templates.
const PROMPT_TOMLS: &[(&str, &str)] = &[
    ("district", include_str!("../prompts/district.toml")),
    ("category", include_str!("../prompts/category.toml")),
    ("city", include_str!("../prompts/city.toml")),
    ("pop", include_str!("../prompts/pop.toml")),
];

const FORMAT_REMINDER: &str =
    "Return the answer strictly in the requested JSON format, with no extra commentary.";

/// One prompt template.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    /// Which prompt this is (`district`, `category`, `city`, or `pop`).
    pub scope: String,
    /// Describes the data that follows. `{city}` is replaced with the city
    /// name.
    #[serde(default)]
    pub summary: String,
    /// Asks for an interpretation of the data.
    pub interpretation: String,
    /// Asks for a forecast and fixes the answer length.
    pub forecast: String,
}

/// Which kind of answer a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Long-form commentary.
    Extended,
    /// A few-word pop-up forecast.
    Pop,
}

/// All prompt templates, keyed by name.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    templates: BTreeMap<&'static str, PromptTemplate>,
}

impl PromptTemplates {
    /// Loads the embedded templates.
    ///
    /// # Panics
    ///
    /// Panics if any embedded TOML file fails to parse. Since these are
    /// compile-time constants, parse failures indicate a development error
    /// and are caught by the tests.
    #[must_use]
    pub fn embedded() -> Self {
        let templates = PROMPT_TOMLS
            .iter()
            .map(|(name, toml_str)| {
                let template: PromptTemplate = toml::de::from_str(toml_str)
                    .unwrap_or_else(|e| panic!("Failed to parse prompt template '{name}': {e}"));
                (*name, template)
            })
            .collect();

        Self { templates }
    }

    /// Looks up a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// Renders the prompt for `stats`.
    ///
    /// `city` carries the city-wide comparison and is omitted for the city
    /// scope itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the statistics cannot be serialized, or if no
    /// template is registered for the scope.
    pub fn render(
        &self,
        kind: PromptKind,
        city_name: &str,
        stats: &ScopeStats,
        city: Option<&CityStats>,
    ) -> Result<String, RenderError> {
        let scope = stats.scope();
        let base = self.require(scope.kind())?;
        let sections = match kind {
            PromptKind::Extended => base,
            PromptKind::Pop => self.require("pop")?,
        };

        let mut prompt = String::new();
        for section in [
            base.summary.as_str(),
            sections.interpretation.as_str(),
            sections.forecast.as_str(),
            FORMAT_REMINDER,
        ] {
            prompt.push_str(section.trim());
            prompt.push_str("\n\n");
        }
        let mut prompt = prompt.replace("{city}", city_name);

        prompt.push_str(&format!("Statistics for {scope}:\n"));
        prompt.push_str(&serde_json::to_string_pretty(stats)?);

        if let Some(city) = city.filter(|_| scope != Scope::City) {
            prompt.push_str(&format!("\n\nCity-wide statistics for {city_name}:\n"));
            prompt.push_str(&serde_json::to_string_pretty(city)?);
        }

        Ok(prompt)
    }

    fn require(&self, name: &str) -> Result<&PromptTemplate, RenderError> {
        self.get(name).ok_or_else(|| RenderError::MissingTemplate {
            name: name.to_string(),
        })
    }
}

/// Errors from [`PromptTemplates::render`].
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Statistics could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No template with this name is registered.
    #[error("No prompt template named '{name}'")]
    MissingTemplate {
        /// The requested template name.
        name: String,
    },
}
