//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/publisher/engine wiring
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};

use stockline_infra::{ConfigError, ServiceConfig};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router from configuration.
///
/// Must run inside a tokio runtime (store pools are created here).
pub async fn build_app(config: &ServiceConfig) -> Result<Router, ConfigError> {
    let services = Arc::new(AppServices::from_config(config)?);
    Ok(router(services))
}

/// Router over already-built services (the binary keeps a handle for shutdown).
pub fn router(services: Arc<AppServices>) -> Router {
    routes::router().layer(Extension(services))
}
