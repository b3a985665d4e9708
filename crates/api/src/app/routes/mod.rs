use axum::{routing::get, Router};

pub mod inventory;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(system::healthz))
        .nest("/inventory", inventory::router())
}
