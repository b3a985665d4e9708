use std::sync::Arc;

use tracing::error;

use stockline_infra::{
    build_publisher, build_store, ConfigError, HealthReport, OutcomePublisher, ReservationEngine, ServiceConfig,
    SharedStore,
};

/// The engine as wired by the service: dynamic store, configured publisher.
pub type Engine = ReservationEngine<SharedStore, OutcomePublisher>;

/// Services shared by every request handler.
pub struct AppServices {
    engine: Arc<Engine>,
}

impl AppServices {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Resolve the store backend and publisher once, at startup.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let store = build_store(&config.store)?;
        let publisher = build_publisher(&config.publisher)?;
        Ok(Self::new(ReservationEngine::new(store, publisher)))
    }

    pub fn engine(&self) -> Arc<Engine> {
        self.engine.clone()
    }

    /// Store health, computed off the async workers.
    pub async fn health(&self) -> HealthReport {
        let engine = self.engine();
        let backend = engine.store().backend();
        match tokio::task::spawn_blocking(move || engine.health()).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "health check task failed");
                HealthReport {
                    ok: false,
                    backend,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Release store connections.
    pub async fn shutdown(&self) {
        let engine = self.engine();
        if let Err(e) = tokio::task::spawn_blocking(move || engine.shutdown()).await {
            error!(error = %e, "store shutdown task failed");
        }
    }
}
