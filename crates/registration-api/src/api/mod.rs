//! HTTP API for registration intake.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{
    cors_layer, handle_panic, logging_middleware, rate_limit_middleware, RateLimitState,
};
pub use types::*;

use crate::config::{AppConfig, Config};
use crate::registration::RegistrationAdapter;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::{predicate::SizeAbove, CompressionLayer};
use tower_http::trace::TraceLayer;

/// Responses smaller than this are sent uncompressed.
const COMPRESSION_MIN_SIZE: u16 = 1000;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Registration persistence
    pub adapter: Arc<RegistrationAdapter>,
    /// Service metadata reported by `/` and `/health`
    pub app: Arc<AppConfig>,
}

impl AppState {
    /// Create new application state.
    pub fn new(adapter: RegistrationAdapter, app: AppConfig) -> Self {
        Self {
            adapter: Arc::new(adapter),
            app: Arc::new(app),
        }
    }
}

/// Create the API router with the default rate limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, Some(RateLimitState::new(10)))
}

/// Create the API router. Registration routes are rate limited when
/// `rate_limit` is set; `/` and `/health` never are.
pub fn create_router_with_rate_limit(
    state: AppState,
    rate_limit: Option<RateLimitState>,
) -> Router {
    let mut registrations = Router::new()
        .route("/api/v1/registrations", post(handlers::create_registration))
        .route(
            "/api/v1/registrations/:registration_id",
            get(handlers::get_registration),
        );

    if let Some(rate_limit) = rate_limit {
        registrations = registrations.route_layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));
    }

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(registrations)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the full application: router plus CORS and compression as
/// configured.
pub fn create_app(state: AppState, config: &Config) -> Router {
    let rate_limit = config.rate_limit.enabled.then(|| {
        RateLimitState::new(config.rate_limit.per_minute)
            .with_forwarded_for(config.rate_limit.trust_forwarded_for)
    });

    create_router_with_rate_limit(state, rate_limit)
        .layer(CompressionLayer::new().compress_when(SizeAbove::new(COMPRESSION_MIN_SIZE)))
        .layer(cors_layer(&config.server, config.app.debug))
}
