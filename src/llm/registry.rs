//! Registry of the models this process is allowed to use

use super::{LlmError, LlmService, LoggingService, OpenAiCompatService};
use crate::config::LlmSettings;
use std::collections::HashMap;
use std::sync::Arc;

/// Model id to service lookup, every service wrapped for logging
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    /// One `OpenAI`-compatible service per allowed model
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();
        for model in &settings.allowed_models {
            let service = OpenAiCompatService::new(settings, model.clone())?;
            services.insert(
                model.clone(),
                Arc::new(LoggingService::new(Arc::new(service))),
            );
        }

        Ok(Self {
            services,
            default_model: settings.model.clone(),
        })
    }

    /// Registry over pre-built services. The first one is the default.
    pub fn from_services(services: Vec<Arc<dyn LlmService>>) -> Self {
        let default_model = services
            .first()
            .map(|s| s.model_id().to_string())
            .unwrap_or_default();
        let services = services
            .into_iter()
            .map(|s| (s.model_id().to_string(), s))
            .collect();
        Self {
            services,
            default_model,
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs, sorted
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }
}
