//! Authentication/authorization is explicitly out of scope (spec.md §1), but
//! the server still wires a named extension point rather than hardcoding
//! "no auth": a real deployment swaps in an `AuthorizationHook` without
//! touching routing.

use axum::extract::Request;
use axum::http::StatusCode;
use std::sync::Arc;

/// A hook point for request authorization. The default, permissive
/// implementation never rejects a request; a deployment that needs auth
/// implements this trait and installs it on `AppState` instead.
pub trait AuthorizationHook: Send + Sync {
    fn authorize(&self, request: &Request) -> Result<(), StatusCode>;
}

/// The inert default: every request is allowed through.
pub struct AllowAll;

impl AuthorizationHook for AllowAll {
    fn authorize(&self, _request: &Request) -> Result<(), StatusCode> {
        Ok(())
    }
}

pub type DynAuthorizationHook = Arc<dyn AuthorizationHook>;

pub fn default_hook() -> DynAuthorizationHook {
    Arc::new(AllowAll)
}
