use crate::client::config::EngineConfig;
use crate::transport::ModelService;
use std::sync::Arc;

/// Validated streaming chat engine.
///
/// Holds the model service and the engine-wide defaults. Cheap to clone; clones share
/// the same service.
#[derive(Clone)]
pub struct ChatEngine {
    pub(crate) service: Arc<dyn ModelService>,
    pub(crate) config: EngineConfig,
}

impl ChatEngine {
    pub fn new(service: Arc<dyn ModelService>, config: EngineConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl std::fmt::Debug for ChatEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
