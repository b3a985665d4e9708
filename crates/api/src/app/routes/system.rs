use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::dto::HealthResponse;
use crate::app::services::AppServices;

pub async fn healthz(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let report = services.health().await;

    if report.ok {
        (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                backend: report.backend,
                error: None,
            }),
        )
            .into_response()
    } else {
        // Backend detail stays in the logs.
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                ok: false,
                backend: report.backend,
                error: Some("store unavailable"),
            }),
        )
            .into_response()
    }
}
