//! Infrastructure layer: store backends, outcome publishing, configuration,
//! and the reservation pipeline that composes them.

pub mod config;
pub mod publisher;
pub mod reservation;
pub mod stock_store;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, PublisherConfig, ServiceConfig, StoreBackendConfig, OUTCOME_DESTINATION};
pub use publisher::{build_publisher, OutcomePublisher, PublishError};
pub use reservation::{HealthReport, ReservationEngine, ReservationError};
pub use stock_store::{build_store, SharedStore};
