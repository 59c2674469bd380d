//! Maps `odata_core::Error` onto the §6/§7 error response shape and HTTP
//! status, the one place in the server that turns a pipeline `Result` into
//! a response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use odata_core::{Error, ODataErrorBody};

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.code(), "request failed");
        } else {
            tracing::debug!(error = %self.0, code = self.0.code(), "request rejected");
        }
        let body = ODataErrorBody::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}
