//! Response schemas and strict decoding.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::AiError;

/// JSON shape a generated answer must take. Every field is a required
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseSchema {
    /// `{ "extended_answer": string, "status": string }`
    Extended,
    /// `{ "brief_answer": string }`
    Brief,
}

impl ResponseSchema {
    /// Schema name, used where a provider wants one.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Extended => "extended_answer",
            Self::Brief => "brief_answer",
        }
    }

    /// Required string fields.
    #[must_use]
    pub const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Extended => &["extended_answer", "status"],
            Self::Brief => &["brief_answer"],
        }
    }

    /// Standard JSON Schema for the shape.
    #[must_use]
    pub fn json_schema(self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .fields()
            .iter()
            .map(|f| ((*f).to_string(), serde_json::json!({ "type": "string" })))
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.fields(),
            "additionalProperties": false,
        })
    }

    /// Decodes a raw answer into `T`, failing on any schema mismatch.
    ///
    /// Tolerates a surrounding Markdown code fence, which some models add
    /// even when asked for bare JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Schema`] if the text is not a JSON object with
    /// every required field present as a string.
    pub fn decode<T: DeserializeOwned>(self, text: &str) -> Result<T, AiError> {
        let mismatch = |message: String| AiError::Schema {
            schema: self.name(),
            message,
        };

        let value: serde_json::Value = serde_json::from_str(strip_code_fence(text))
            .map_err(|e| mismatch(format!("not JSON: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| mismatch("not a JSON object".to_string()))?;

        for field in self.fields() {
            match object.get(*field) {
                Some(serde_json::Value::String(_)) => {}
                Some(other) => {
                    return Err(mismatch(format!("field {field} is not a string: {other}")));
                }
                None => return Err(mismatch(format!("missing field {field}"))),
            }
        }

        serde_json::from_value(value).map_err(|e| mismatch(e.to_string()))
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Answer to an [`ResponseSchema::Extended`] request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedAnswer {
    /// The commentary.
    pub extended_answer: String,
    /// Status flag chosen by the model.
    pub status: String,
}

/// Answer to a [`ResponseSchema::Brief`] request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefAnswer {
    /// A few words of forecast.
    pub brief_answer: String,
}
