//! axum HTTP server wiring for the OData v4 entity-set URL surface: request
//! routing, the pipeline error mapping, and the ambient health/observability
//! endpoints around it.

pub mod auth;
pub mod error;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;

pub use auth::{AuthorizationHook, DynAuthorizationHook};
pub use error::ApiError;
pub use server::{build_app, build_app_with_hook, AppState, OdataServer, ServerBuilder};
