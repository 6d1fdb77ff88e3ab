//! Output validation
//!
//! A validator inspects the text of a chat reply and either accepts it
//! (possibly transforming it, e.g. extracting the JSON substring) or
//! rejects it with a retry addendum for the next attempt. Embedding
//! replies are never validated.

pub mod json;
pub mod pattern;
pub mod text;

pub use json::{JsonType, Schema};

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::utils::error::{Error, Result};

/// Caller-supplied free-text predicate: `(accepted, message)`
pub type TextPredicate = Arc<dyn Fn(&str) -> (bool, Option<String>) + Send + Sync>;

/// Result of validating one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the reply was accepted
    pub ok: bool,
    /// The accepted text, possibly transformed (e.g. extracted JSON)
    pub value: Option<String>,
    /// Failure description
    pub error: Option<String>,
    /// Addendum to append to the prompt for the next attempt
    pub retry_suffix: Option<String>,
}

impl ValidationOutcome {
    pub(crate) fn pass(value: impl Into<String>) -> Self {
        Self { ok: true, value: Some(value.into()), error: None, retry_suffix: None }
    }

    pub(crate) fn fail(error: impl Into<String>, retry_suffix: impl Into<String>) -> Self {
        Self { ok: false, value: None, error: Some(error.into()), retry_suffix: Some(retry_suffix.into()) }
    }
}

/// Post-dispatch reply validator
#[derive(Clone)]
pub enum Validator {
    /// JSON output, optionally checked against a schema
    Json {
        /// Required fields and their primitive types
        schema: Option<Schema>,
        /// When set, the entire reply must parse; otherwise the largest
        /// well-formed JSON substring is extracted
        strict: bool,
    },
    /// Caller-supplied predicate over the reply text
    Text(TextPredicate),
    /// The reply must match a pattern
    Pattern(Regex),
}

impl Validator {
    /// JSON validator without a schema
    pub fn json(strict: bool) -> Self {
        Validator::Json { schema: None, strict }
    }

    /// JSON validator with a schema of required fields
    pub fn json_with_schema(schema: Schema, strict: bool) -> Self {
        Validator::Json { schema: Some(schema), strict }
    }

    /// Free-text validator from a predicate
    pub fn text<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> (bool, Option<String>) + Send + Sync + 'static,
    {
        Validator::Text(Arc::new(predicate))
    }

    /// Pattern validator from a pattern string
    pub fn pattern(pattern: &str, case_insensitive: bool) -> Result<Self> {
        let regex = regex::RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| Error::Config(format!("Invalid validator pattern: {}", e)))?;
        Ok(Self::pattern_from_regex(regex))
    }

    /// Pattern validator from an already compiled regex
    ///
    /// The string form above compiles and delegates here; compiled regexes
    /// keep whatever flags they were built with.
    pub fn pattern_from_regex(regex: Regex) -> Self {
        Validator::Pattern(regex)
    }

    /// Validate one reply text
    pub fn validate(&self, output: &str) -> ValidationOutcome {
        match self {
            Validator::Json { schema, strict } => json::validate(output, schema.as_ref(), *strict),
            Validator::Text(predicate) => text::validate(predicate, output),
            Validator::Pattern(regex) => pattern::validate(regex, output),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Json { schema, strict } => f
                .debug_struct("Json")
                .field("schema", schema)
                .field("strict", strict)
                .finish(),
            Validator::Text(_) => f.debug_tuple("Text").field(&"<predicate>").finish(),
            Validator::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
        }
    }
}
