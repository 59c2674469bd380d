//! Builds the axum [`Router`] and runs it, grounded on the teacher's
//! `server::{AppState, ServerBuilder, OctofhirServer, build_app}` shape,
//! trimmed to the §6 entity-set route family plus health checks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use odata_config::ReloadableConfig;
use odata_engine::EntityRegistry;
use odata_storage::DynProvider;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, DynAuthorizationHook};
use crate::{health, middleware as app_middleware, routes};

/// Inert default: generous enough to never throttle a real deployment by
/// itself, overridable by wrapping the router this builds.
const DEFAULT_CONCURRENCY_LIMIT: usize = 4096;

#[derive(Clone)]
pub struct AppState {
    pub registry: EntityRegistry,
    pub provider: DynProvider,
    pub config: ReloadableConfig,
    pub auth_hook: DynAuthorizationHook,
}

pub fn build_app(registry: EntityRegistry, provider: DynProvider, config: ReloadableConfig) -> Router {
    build_app_with_hook(registry, provider, config, auth::default_hook())
}

pub fn build_app_with_hook(registry: EntityRegistry, provider: DynProvider, config: ReloadableConfig, auth_hook: DynAuthorizationHook) -> Router {
    let state = AppState { registry, provider, config, auth_hook };

    // CORS is explicitly out of scope (spec.md §1); this permissive layer is
    // an inert default, not a security posture.
    let cors = CorsLayer::new().allow_origin(tower_http::cors::Any).allow_methods(tower_http::cors::Any).allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route(
            "/{segment}",
            get(routes::get).post(routes::post).put(routes::put_or_patch).patch(routes::put_or_patch).delete(routes::delete),
        )
        .layer(axum::middleware::from_fn(app_middleware::request_id))
        .layer(axum::middleware::from_fn_with_state(state.clone(), app_middleware::authorization))
        .layer(axum::middleware::from_fn(app_middleware::content_negotiation))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(ConcurrencyLimitLayer::new(DEFAULT_CONCURRENCY_LIMIT))
        .with_state(state)
}

pub struct OdataServer {
    addr: SocketAddr,
    app: Router,
}

impl OdataServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!(addr = %self.addr, "listening");
        axum::serve(listener, self.app).with_graceful_shutdown(shutdown_signal()).await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

pub struct ServerBuilder {
    addr: SocketAddr,
    registry: EntityRegistry,
    provider: DynProvider,
    config: ReloadableConfig,
    auth_hook: DynAuthorizationHook,
}

impl ServerBuilder {
    pub fn new(registry: EntityRegistry, provider: DynProvider, config: ReloadableConfig) -> Self {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.current().server.port));
        Self { addr, registry, provider, config, auth_hook: auth::default_hook() }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_auth_hook(mut self, hook: DynAuthorizationHook) -> Self {
        self.auth_hook = hook;
        self
    }

    pub fn build(self) -> OdataServer {
        let app = build_app_with_hook(self.registry, self.provider, self.config, self.auth_hook);
        OdataServer { addr: self.addr, app }
    }
}

#[allow(dead_code)]
fn unused_warmup(_headers: HeaderValue, _method: Method, _timeout: Duration) {}
