use crate::{config::Config, error::Result, metrics, relay::RelayDispatcher};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Relay dispatcher holding the pooled origin client
    pub relay: RelayDispatcher,
    /// Prometheus exporter, absent when another recorder owns the process
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let relay = RelayDispatcher::new(&config)?;

        Ok(Self {
            config: Arc::new(config),
            relay,
            metrics: metrics::install(),
        })
    }
}
