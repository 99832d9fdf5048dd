//! Engine configuration: defaults, YAML loading and environment overrides.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_RETRIES: u32 = 3;

/// Engine-wide settings. Per-call values in `ChatOptions` take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root URL of the model chat service.
    pub base_url: String,
    /// Model used when a call does not name one.
    pub default_model: String,
    /// Retry budget used when a call does not set one.
    pub default_retries: u32,
    /// Bound on establishing the HTTP connection. Streaming an answer has no time limit.
    pub connect_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub proxy: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_retries: DEFAULT_RETRIES,
            connect_timeout_secs: 30,
            pool_max_idle_per_host: 32,
            proxy: None,
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Apply overrides from the process environment:
    /// - `OLLAMA_HOST`: service address (scheme optional)
    /// - `AI_CHAT_MODEL`: default model
    /// - `AI_HTTP_CONNECT_TIMEOUT_SECS`: connect timeout
    /// - `AI_PROXY_URL`: HTTP proxy
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup("OLLAMA_HOST").filter(|s| !s.trim().is_empty()) {
            self.base_url = normalize_base_url(&host);
        }
        if let Some(model) = lookup("AI_CHAT_MODEL").filter(|s| !s.trim().is_empty()) {
            self.default_model = model;
        }
        if let Some(secs) =
            lookup("AI_HTTP_CONNECT_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok())
        {
            self.connect_timeout_secs = secs;
        }
        if let Some(proxy) = lookup("AI_PROXY_URL").filter(|s| !s.trim().is_empty()) {
            self.proxy = Some(proxy);
        }
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "invalid engine config",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("engine_config"),
            )
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml).map_err(|e| match e {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.with_field_path(path.display().to_string()),
            },
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base_url '{}'", self.base_url),
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_details(e.to_string())
                    .with_source("engine_config"),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                format!("unsupported scheme '{}'", url.scheme()),
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_source("engine_config"),
            ));
        }
        if self.default_model.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "default_model must not be empty",
                ErrorContext::new()
                    .with_field_path("config.default_model")
                    .with_source("engine_config"),
            ));
        }
        Ok(())
    }
}

/// Accept `host:port` as well as full URLs, and drop any trailing slash.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_local_service() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.base_url, "http://localhost:11434");
        assert_eq!(cfg.default_model, "llama3");
        assert_eq!(cfg.default_retries, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("OLLAMA_HOST", "10.0.0.2:11434/"),
            ("AI_CHAT_MODEL", "mistral"),
            ("AI_HTTP_CONNECT_TIMEOUT_SECS", "12"),
        ]
        .into_iter()
        .collect();
        let cfg = EngineConfig::default().apply_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.base_url, "http://10.0.0.2:11434");
        assert_eq!(cfg.default_model, "mistral");
        assert_eq!(cfg.connect_timeout_secs, 12);
        assert_eq!(cfg.proxy, None);
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let cfg = EngineConfig::from_yaml_str("default_model: phi3\ndefault_retries: 5\n").unwrap();
        assert_eq!(cfg.default_model, "phi3");
        assert_eq!(cfg.default_retries, 5);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn bad_yaml_and_bad_url_are_configuration_errors() {
        assert!(matches!(
            EngineConfig::from_yaml_str("default_retries: many"),
            Err(Error::Configuration { .. })
        ));

        let cfg = EngineConfig {
            base_url: "ftp://example.com".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Configuration { .. })));
    }
}
