//! Request-scoped middleware, trimmed from the teacher's `middleware` module
//! to the pieces this server still needs: a request id, JSON content
//! negotiation, and the authorization extension point.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::server::AppState;

/// Ensures each request carries an `X-Request-Id`, generating one if absent,
/// and mirrors it onto the response.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static("x-request-id");
    let value = req
        .headers()
        .get(&header_name)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap());

    req.extensions_mut().insert(value.clone());
    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, value);
    res
}

/// Accepts and requires JSON only, matching the §6 response shape (no FHIR
/// content negotiation, unlike the teacher's version of this middleware).
pub async fn content_negotiation(req: Request<Body>, next: Next) -> Response {
    let accept_ok = req
        .headers()
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("application/json") || v.contains("*/*")
        })
        .unwrap_or(true);
    if !accept_ok {
        return json_error(StatusCode::NOT_ACCEPTABLE, "only application/json is supported");
    }

    let method = req.method().clone();
    if method == axum::http::Method::POST || method == axum::http::Method::PUT || method == axum::http::Method::PATCH {
        let content_ok = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false);
        if !content_ok {
            return json_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Content-Type must be application/json");
        }
    }

    next.run(req).await
}

/// Calls the installed `AuthorizationHook`, short-circuiting with its status
/// on rejection. The default hook never rejects.
pub async fn authorization(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if let Err(status) = state.auth_hook.authorize(&req) {
        return json_error(status, "request not authorized");
    }
    next.run(req).await
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": { "code": status.as_str(), "message": message } }))).into_response()
}
