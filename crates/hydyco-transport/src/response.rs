//! Response helpers shared by built-in handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hydyco_protocol::ErrorBody;

/// Render an [`ErrorBody`] as a JSON response with the matching status.
pub fn error_response(body: ErrorBody) -> Response {
    let status = StatusCode::from_u16(body.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}
