use faststr::FastStr;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("provider entry is missing a name")]
    MissingName,

    #[error("provider {0} is missing a base_url")]
    MissingBaseUrl(FastStr),

    #[error("duplicate provider name: {0}")]
    DuplicateName(FastStr),

    #[error("credential ${{{0}}} is not set in the environment")]
    UnresolvedCredential(FastStr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub name:     FastStr,
    #[serde(rename = "type")]
    pub kind:     ProviderKind,
    pub base_url: FastStr,
    #[serde(default)]
    pub api_key:  Option<FastStr>,
    #[serde(default)]
    pub models:   Vec<FastStr>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level:        FastStr,
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level:        "info".into(),
            max_request_size: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub server:    ServerConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.name.is_empty() {
                return Err(ConfigError::MissingName);
            }
            if provider.base_url.is_empty() {
                return Err(ConfigError::MissingBaseUrl(provider.name.clone()));
            }
            if !seen.insert(provider.name.clone()) {
                return Err(ConfigError::DuplicateName(provider.name.clone()));
            }
        }
        Ok(())
    }
}

/// Resolves a configured credential, binding `${NAME}` references against the
/// process environment exactly once. Later environment changes have no effect
/// on the returned value.
pub fn resolve_credential(raw: &str) -> Result<FastStr, ConfigError> {
    match raw.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(name) => match std::env::var(name) {
            Ok(value) => Ok(value.into()),
            Err(_) => Err(ConfigError::UnresolvedCredential(name.to_owned().into())),
        },
        None => Ok(raw.to_owned().into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_TOML: &str = r#"
[server]
log_level = "debug"
max_request_size = 1048576

[[providers]]
name = "openai"
type = "openai"
base_url = "https://api.openai.com/v1"
api_key = "${OPENAI_API_KEY}"
models = ["gpt-4", "gpt-3.5-turbo"]
priority = 1

[[providers]]
name = "local"
type = "ollama"
base_url = "http://localhost:11434"
models = ["llama3"]
priority = 3
"#;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(CONFIG_TOML).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.max_request_size, 1_048_576);
        assert_eq!(config.providers.len(), 2);

        let openai = &config.providers[0];
        assert_eq!(openai.kind, ProviderKind::OpenAi);
        assert_eq!(openai.api_key.as_deref(), Some("${OPENAI_API_KEY}"));
        assert_eq!(openai.models, ["gpt-4", "gpt-3.5-turbo"]);
        assert_eq!(openai.priority, 1);

        let local = &config.providers[1];
        assert_eq!(local.kind, ProviderKind::Ollama);
        assert!(local.api_key.is_none());
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.providers.is_empty());
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.max_request_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let raw = r#"
[[providers]]
name = "p"
type = "gemini"
base_url = "http://u"
"#;
        assert!(toml::from_str::<Config>(raw).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let raw = r#"
[[providers]]
name = "p"
type = "openai"
base_url = "http://u"

[[providers]]
name = "p"
type = "ollama"
base_url = "http://v"
"#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateName(name)) if name == "p"
        ));
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let raw = r#"
[[providers]]
name = "p"
type = "openai"
base_url = ""
"#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingBaseUrl(_))
        ));
    }

    #[test]
    fn test_resolve_literal_credential() {
        let resolved = resolve_credential("sk-test-123").unwrap();
        assert_eq!(resolved, "sk-test-123");
    }

    #[test]
    fn test_resolve_env_credential_binds_once() {
        unsafe { std::env::set_var("MODELPLEX_CONFIG_TEST_KEY", "from-env") };
        let resolved = resolve_credential("${MODELPLEX_CONFIG_TEST_KEY}").unwrap();
        assert_eq!(resolved, "from-env");

        unsafe { std::env::set_var("MODELPLEX_CONFIG_TEST_KEY", "changed-later") };
        assert_eq!(resolved, "from-env");
    }

    #[test]
    fn test_unresolved_env_credential_fails() {
        let resolved = resolve_credential("${MODELPLEX_CONFIG_TEST_UNSET}");
        assert!(matches!(
            resolved,
            Err(ConfigError::UnresolvedCredential(name)) if name == "MODELPLEX_CONFIG_TEST_UNSET"
        ));
    }
}
