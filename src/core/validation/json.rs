//! JSON validation
//!
//! Strict mode requires the whole reply to parse. Non-strict mode scans
//! the reply for the largest well-formed JSON object or array. An optional
//! schema lists required fields and their primitive types.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

use super::ValidationOutcome;

/// Primitive JSON type expected for a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    /// JSON string
    String,
    /// JSON number, integer or float
    Number,
    /// JSON number without a fractional part
    Integer,
    /// JSON boolean
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
}

impl JsonType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            JsonType::String => value.is_string(),
            JsonType::Number => value.is_number(),
            JsonType::Integer => value.is_i64() || value.is_u64(),
            JsonType::Boolean => value.is_boolean(),
            JsonType::Array => value.is_array(),
            JsonType::Object => value.is_object(),
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Array => "array",
            JsonType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Required fields of a JSON object reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<(String, JsonType)>,
}

impl Schema {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a field of the given type
    pub fn field(mut self, name: impl Into<String>, ty: JsonType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    /// Check a parsed value against the schema
    pub fn check(&self, value: &Value) -> std::result::Result<(), String> {
        let object = value
            .as_object()
            .ok_or_else(|| "expected a JSON object".to_string())?;
        for (name, ty) in &self.fields {
            match object.get(name) {
                None => return Err(format!("missing required field: {}", name)),
                Some(field) if !ty.matches(field) => {
                    return Err(format!("field {} must be of type {}", name, ty))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Human-readable restatement for retry prompts
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|(name, ty)| format!("- {} ({})", name, ty))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub(super) fn validate(output: &str, schema: Option<&Schema>, strict: bool) -> ValidationOutcome {
    let trimmed = output.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(parsed) => match check_schema(&parsed, schema) {
            Ok(()) => ValidationOutcome::pass(trimmed),
            Err(error) => {
                let message = format!("JSON schema validation failed: {}", error);
                fail(output, schema, strict, message)
            }
        },
        Err(parse_error) => {
            if strict {
                let message = format!("Invalid JSON format: {}", parse_error);
                return fail(output, schema, strict, message);
            }
            match extract_json(output) {
                Some((candidate, parsed)) => match check_schema(&parsed, schema) {
                    Ok(()) => ValidationOutcome::pass(candidate),
                    Err(error) => {
                        let message = format!("Extracted JSON schema validation failed: {}", error);
                        fail(output, schema, strict, message)
                    }
                },
                None => fail(output, schema, strict, "No valid JSON found in output".to_string()),
            }
        }
    }
}

fn check_schema(parsed: &Value, schema: Option<&Schema>) -> std::result::Result<(), String> {
    match schema {
        Some(schema) => schema.check(parsed),
        None => Ok(()),
    }
}

fn fail(output: &str, schema: Option<&Schema>, strict: bool, message: String) -> ValidationOutcome {
    ValidationOutcome::fail(message.clone(), retry_prompt(output, schema, strict, &message))
}

/// The largest well-formed JSON object or array embedded in the text
fn extract_json(text: &str) -> Option<(String, Value)> {
    static OBJECT_PATTERN: OnceLock<Regex> = OnceLock::new();
    static ARRAY_PATTERN: OnceLock<Regex> = OnceLock::new();
    let object_pattern = OBJECT_PATTERN
        .get_or_init(|| Regex::new(r"\{(?:[^{}]|\{(?:[^{}]|\{[^{}]*\})*\})*\}").unwrap());
    let array_pattern = ARRAY_PATTERN
        .get_or_init(|| Regex::new(r"\[(?:[^\[\]]|\[(?:[^\[\]]|\[[^\[\]]*\])*\])*\]").unwrap());

    let mut best: Option<(String, Value)> = None;
    for pattern in [object_pattern, array_pattern] {
        for candidate in pattern.find_iter(text) {
            let candidate = candidate.as_str();
            if let Ok(parsed) = serde_json::from_str::<Value>(candidate) {
                let longer = best
                    .as_ref()
                    .map(|(current, _)| candidate.len() > current.len())
                    .unwrap_or(true);
                if longer {
                    best = Some((candidate.to_string(), parsed));
                }
            }
        }
    }
    best
}

fn retry_prompt(output: &str, schema: Option<&Schema>, strict: bool, error: &str) -> String {
    let mut prompt = format!(
        "Your previous response had a JSON format error: {}\n\nPrevious response:\n{}\n\nPlease provide a valid JSON response that follows the required format.",
        error, output
    );
    if let Some(schema) = schema {
        prompt.push_str(&format!("\n\nRequired JSON fields:\n{}", schema.describe()));
    }
    if strict {
        prompt.push_str("\n\nPlease respond with ONLY valid JSON, no additional text.");
    } else {
        prompt.push_str(
            "\n\nYou can include explanatory text, but make sure to include a valid JSON object or array.",
        );
    }
    prompt
}
