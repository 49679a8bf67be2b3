use std::sync::Arc;

use crate::config::AppConfig;
use crate::guidance::matcher::ElementMatcher;
use crate::guidance::runner::StepRunner;
use crate::guidance::store::StepStore;
use crate::instructions::generator::InstructionGenerator;
use crate::reasoning::client::HttpReasoningClient;
use crate::reasoning::service::ReasoningService;

/// Shared handles for the HTTP handlers. Everything is wired at startup;
/// handlers hold no state of their own.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<StepStore>,
    pub runner: Arc<StepRunner>,
    pub generator: Arc<InstructionGenerator>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(StepStore::new(config.storage.resolve_data_dir()));

        let service: Arc<dyn ReasoningService> = Arc::new(HttpReasoningClient::new(
            config.reasoning.api_base.clone(),
            config.reasoning.resolve_api_key(),
        ));

        let matcher = ElementMatcher::new(service.clone(), config.reasoning.roles.select.clone());
        let runner = Arc::new(StepRunner::new(store.clone(), matcher));
        let generator = Arc::new(InstructionGenerator::new(
            service,
            store.clone(),
            config.reasoning.roles.instruct.clone(),
        ));

        Self {
            config,
            store,
            runner,
            generator,
            http: reqwest::Client::new(),
        }
    }

    /// Record key for a request, honoring an explicit override.
    pub fn record_key(&self, requested: Option<String>) -> String {
        requested.unwrap_or_else(|| self.config.storage.default_record.clone())
    }
}
