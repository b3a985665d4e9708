use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::error;

use crate::app::dto::{ApplyInventoryRequest, ApplyInventoryResponse};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/apply", post(apply_inventory))
}

pub async fn apply_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<ApplyInventoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return errors::json_detail(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let engine = services.engine();
    let ApplyInventoryRequest { order_id, items } = body;

    // Store and sink calls block; keep them off the async workers.
    let result = tokio::task::spawn_blocking(move || engine.reserve(&order_id, items)).await;

    match result {
        Ok(Ok(event)) => (
            StatusCode::OK,
            Json(ApplyInventoryResponse {
                order_id: event.order_id.to_string(),
                status: event.status.as_str(),
            }),
        )
            .into_response(),
        Ok(Err(e)) => errors::reservation_error_to_response(e),
        Err(e) => {
            error!(error = %e, "reservation task failed");
            errors::json_detail(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}
