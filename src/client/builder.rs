use crate::client::config::{normalize_base_url, EngineConfig};
use crate::client::core::ChatEngine;
use crate::transport::{HttpTransport, ModelService};
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for creating engines with custom configuration.
///
/// Precedence, lowest first: built-in defaults, config file or explicit
/// [`EngineConfig`], environment, builder overrides.
#[derive(Default)]
pub struct ChatEngineBuilder {
    config: Option<EngineConfig>,
    config_path: Option<PathBuf>,
    skip_env: bool,
    /// Override base URL (primarily for testing with mock servers)
    base_url_override: Option<String>,
    default_model: Option<String>,
    default_retries: Option<u32>,
    service: Option<Arc<dyn ModelService>>,
}

impl ChatEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit config instead of the defaults.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load the starting config from a YAML file.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Ignore `OLLAMA_HOST` and friends.
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Override the service base URL.
    pub fn base_url_override(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn default_retries(mut self, retries: u32) -> Self {
        self.default_retries = Some(retries);
        self
    }

    /// Use a custom model service instead of the HTTP transport.
    pub fn with_service(mut self, service: Arc<dyn ModelService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<ChatEngine> {
        let mut config = match (self.config, &self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load(path)?,
            (None, None) => EngineConfig::default(),
        };
        if !self.skip_env {
            config = config.apply_env();
        }
        if let Some(url) = self.base_url_override {
            config.base_url = normalize_base_url(&url);
        }
        if let Some(model) = self.default_model {
            config.default_model = model;
        }
        if let Some(retries) = self.default_retries {
            config.default_retries = retries;
        }
        config.validate()?;

        let service = match self.service {
            Some(service) => service,
            None => Arc::new(HttpTransport::new(&config)?),
        };

        Ok(ChatEngine::new(service, config))
    }
}
