//! Configuration loading

use std::env;
use std::path::Path;
use tracing::{debug, info};

use crate::core::providers::ProviderFamily;
use crate::utils::error::{Error, Result};

use super::models::{
    ClientConfig, ProviderEntry, RawConfig, DEFAULT_RATE_LIMIT, DEFAULT_REQUEST_TIMEOUT,
};

impl ClientConfig {
    /// Parse a YAML configuration document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        let enabled: Vec<&str> = raw
            .llm
            .enabled
            .split(',')
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();
        if enabled.is_empty() {
            return Err(Error::Config("No providers specified in config".to_string()));
        }

        let mut families = raw.llm.families;
        let mut providers = Vec::new();
        for name in enabled {
            let family = ProviderFamily::from_config_name(name).ok_or_else(|| {
                Error::Config(format!(
                    "Unknown provider: {}. Available providers: {:?}",
                    name,
                    ProviderFamily::ALL.map(|f| f.config_name())
                ))
            })?;
            let entries = families
                .remove(name)
                .map(|entries| entries.into_vec())
                .unwrap_or_default();
            if entries.is_empty() {
                return Err(Error::Config(format!("No configuration found for provider: {}", name)));
            }
            for entry in entries {
                let model = entry.model.ok_or_else(|| {
                    Error::Config(format!("Provider {} entry is missing required field: model", name))
                })?;
                let rate_limit = entry.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT);
                if rate_limit == 0 {
                    return Err(Error::Config(format!(
                        "Provider {} entry has invalid rate_limit: must be >= 1",
                        name
                    )));
                }
                providers.push(ProviderEntry {
                    family,
                    api_key: entry.api_key,
                    api_base: entry.api_base,
                    model,
                    rate_limit,
                });
            }
        }

        let request_timeout = raw
            .llm
            .timeout
            .map(std::time::Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        debug!(providers = providers.len(), "configuration parsed");
        Ok(Self { providers, request_timeout })
    }

    /// Load configuration from a YAML file
    pub async fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_yaml_str(&content)?;
        info!(path = %path.display(), providers = config.providers.len(), "configuration loaded");
        Ok(config)
    }

    /// Build a synthetic single-instance configuration from the environment
    ///
    /// `LLM_API_KEY` is required. `LLM_PROVIDER` defaults to `openai`;
    /// `LLM_API_BASE` and `LLM_MODEL` have OpenAI defaults and are required
    /// for any other family. `LLM_RATE_LIMIT` falls back to the standard
    /// default.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY")
            .map_err(|_| Error::Config("LLM_API_KEY is not set".to_string()))?;
        let family_name = env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let family = ProviderFamily::from_config_name(&family_name)
            .ok_or_else(|| Error::Config(format!("Unknown provider: {}", family_name)))?;

        let api_base = match env::var("LLM_API_BASE") {
            Ok(base) => base,
            Err(_) if family == ProviderFamily::OpenAi => {
                "https://api.openai.com/v1/chat/completions".to_string()
            }
            Err(_) => {
                return Err(Error::Config(format!(
                    "LLM_API_BASE is required for provider {}",
                    family_name
                )))
            }
        };
        let model = match env::var("LLM_MODEL") {
            Ok(model) => model,
            Err(_) if family == ProviderFamily::OpenAi => "gpt-4o-mini".to_string(),
            Err(_) => {
                return Err(Error::Config(format!(
                    "LLM_MODEL is required for provider {}",
                    family_name
                )))
            }
        };
        let rate_limit = match env::var("LLM_RATE_LIMIT") {
            Ok(value) => value
                .parse::<u32>()
                .map_err(|e| Error::Config(format!("Invalid LLM_RATE_LIMIT: {}", e)))?,
            Err(_) => DEFAULT_RATE_LIMIT,
        };

        Ok(Self {
            providers: vec![ProviderEntry { family, api_key, api_base, model, rate_limit }],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
llm:
  use: openai, google
  openai:
    - api_key: sk-one
      api_base: https://api.openai.com/v1/chat/completions
      model: gpt-4o-mini
      rate_limit: 10
    - api_key: sk-two
      api_base: https://api.openai.com/v1/chat/completions
      model: gpt-4o
  google:
    api_key: g-key
    api_base: https://generativelanguage.googleapis.com
    model: gemini-1.5-flash
"#;

    #[test]
    fn parses_sequence_and_single_entry_forms() {
        let config = ClientConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.providers[0].family, ProviderFamily::OpenAi);
        assert_eq!(config.providers[0].rate_limit, 10);
        assert_eq!(config.providers[1].rate_limit, DEFAULT_RATE_LIMIT);
        assert_eq!(config.providers[2].family, ProviderFamily::Google);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn declaration_order_follows_use_list() {
        let config = ClientConfig::from_yaml_str(SAMPLE).unwrap();
        let families: Vec<_> = config.providers.iter().map(|p| p.family).collect();
        assert_eq!(
            families,
            vec![ProviderFamily::OpenAi, ProviderFamily::OpenAi, ProviderFamily::Google]
        );
    }

    #[test]
    fn missing_model_is_fatal() {
        let yaml = r#"
llm:
  use: openai
  openai:
    - api_key: sk-one
      api_base: https://api.openai.com/v1/chat/completions
"#;
        let err = ClientConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("model")));
    }

    #[test]
    fn unknown_family_is_fatal() {
        let yaml = r#"
llm:
  use: groq
  groq:
    - api_key: k
      api_base: https://example.test
      model: m
"#;
        assert!(matches!(ClientConfig::from_yaml_str(yaml), Err(Error::Config(_))));
    }

    #[test]
    fn family_in_use_without_entries_is_fatal() {
        let yaml = "llm:\n  use: openai\n";
        assert!(matches!(ClientConfig::from_yaml_str(yaml), Err(Error::Config(_))));
    }

    #[test]
    fn extra_entry_keys_are_ignored() {
        let yaml = r#"
llm:
  use: deepseek
  deepseek:
    - api_key: k
      api_base: https://api.deepseek.com/chat/completions
      model: deepseek-chat
      quota: 100000
      label: primary
"#;
        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.providers.len(), 1);
    }

    #[test]
    fn timeout_override() {
        let yaml = r#"
llm:
  use: deepseek
  timeout: 30
  deepseek:
    - api_key: k
      api_base: https://api.deepseek.com/chat/completions
      model: deepseek-chat
"#;
        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.request_timeout, std::time::Duration::from_secs(30));
    }
}
