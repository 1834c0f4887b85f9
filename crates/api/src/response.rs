//! API response types.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Success envelope: `{"data": ...}`.
///
/// Failures never pass through here; they leave handlers as
/// [`ballotbox_common::AppError`], which renders its own `{"error": ...}`
/// envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// The handler's result payload.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a payload in the success envelope.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
