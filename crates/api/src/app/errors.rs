use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockline_infra::ReservationError;

pub const STORE_UNAVAILABLE: &str = "inventory store unavailable";
pub const PUBLISH_FAILED: &str = "inventory event publish failed";

pub fn reservation_error_to_response(err: ReservationError) -> axum::response::Response {
    match err {
        ReservationError::Validation(e) => json_detail(StatusCode::BAD_REQUEST, e.detail()),
        ReservationError::Store(_) => json_detail(StatusCode::SERVICE_UNAVAILABLE, STORE_UNAVAILABLE),
        ReservationError::Publish(_) => json_detail(StatusCode::SERVICE_UNAVAILABLE, PUBLISH_FAILED),
    }
}

pub fn json_detail(status: StatusCode, detail: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "detail": detail.into() }))).into_response()
}
