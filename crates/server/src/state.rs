use std::sync::Arc;

use crate::backend::client::BackendClient;
use crate::backend::{LogStore, MetricStore};
use crate::config::AppConfig;
use crate::events::aggregate::EventAggregator;

/// Shared application state (thread-safe). No mutable shared state lives
/// here — every request builds its own merge structures.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub logs: Arc<dyn LogStore>,
    pub metrics: Arc<dyn MetricStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let client = Arc::new(BackendClient::new(&config.backend)?);
        Ok(Self {
            config: Arc::new(config),
            logs: client.clone(),
            metrics: client,
        })
    }

    /// Test seam: assemble state around in-memory stores.
    pub fn with_stores(
        config: AppConfig,
        logs: Arc<dyn LogStore>,
        metrics: Arc<dyn MetricStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            logs,
            metrics,
        }
    }

    pub fn event_aggregator(&self) -> EventAggregator {
        EventAggregator::new(
            self.logs.clone(),
            self.config.queries.logs.clone(),
            &self.config.events,
        )
    }
}
