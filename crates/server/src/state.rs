//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use turf_advisor_config::Settings;
use turf_advisor_llm::OpenAiChat;
use turf_advisor_pipeline::TurfAdvisor;

use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub advisor: Arc<TurfAdvisor>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
    /// Probed by `/ready`; absent in tests and offline runs
    pub llm: Option<Arc<OpenAiChat>>,
}

impl AppState {
    pub fn new(config: Settings, advisor: TurfAdvisor) -> Self {
        let rate_limiter = RateLimiter::new(&config.rate_limit);
        Self {
            config: Arc::new(config),
            advisor: Arc::new(advisor),
            rate_limiter: Arc::new(rate_limiter),
            metrics: None,
            llm: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    pub fn with_llm_probe(mut self, llm: Arc<OpenAiChat>) -> Self {
        self.llm = Some(llm);
        self
    }
}
