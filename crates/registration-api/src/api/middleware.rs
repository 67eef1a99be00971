//! Rate limiting, CORS, panic and request logging middleware.

use crate::config::ServerConfig;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{
    any::Any,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};
use tower_http::cors::{self, AllowHeaders, CorsLayer};
use tracing::{debug, warn};

/// Rate limiter keyed by client IP.
pub type ClientLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Number of tracked clients above which idle entries are dropped.
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    /// Per-client rate limiter
    pub clients: Arc<ClientLimiter>,
    /// Key clients by the first `X-Forwarded-For` entry instead of the peer
    pub trust_forwarded_for: bool,
}

impl RateLimitState {
    /// Create a new rate limit state. A limit of zero is treated as one.
    pub fn new(requests_per_minute: u32) -> Self {
        let quota =
            Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Self {
            clients: Arc::new(RateLimiter::keyed(quota)),
            trust_forwarded_for: false,
        }
    }

    /// Key clients by `X-Forwarded-For`, for deployments behind a reverse proxy.
    pub fn with_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Create a permissive rate limiter for testing.
    pub fn permissive() -> Self {
        Self::new(1000)
    }

    /// Identify the client a request counts against.
    ///
    /// Requests with no known peer (e.g. served without connect info) share
    /// the unspecified address.
    pub fn client_ip(&self, request: &Request) -> IpAddr {
        if self.trust_forwarded_for {
            if let Some(ip) = forwarded_for(request.headers()) {
                return ip;
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Rate limiting middleware.
///
/// Checks the calling client's limit and returns 429 Too Many Requests if
/// exceeded.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = rate_limit.client_ip(&request);

    if rate_limit.clients.check_key(&client).is_err() {
        warn!(client = %client, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded);
    }

    if rate_limit.clients.len() > PRUNE_THRESHOLD {
        rate_limit.clients.retain_recent();
    }

    debug!(client = %client, "Rate limit check passed");
    Ok(next.run(request).await)
}

/// Logging middleware for requests.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    debug!(%method, %uri, "Request started");

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_success() {
        debug!(%method, %uri, %status, ?duration, "Request completed");
    } else {
        warn!(%method, %uri, %status, ?duration, "Request failed");
    }

    response
}

/// Turn a handler panic into a generic 500 response.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::Internal(format!("handler panicked: {}", message)).into_response()
}

/// Build the CORS layer.
///
/// Debug mode allows any origin without credentials. Otherwise only the
/// configured origins are allowed, with credentials.
pub fn cors_layer(server: &ServerConfig, debug_mode: bool) -> CorsLayer {
    if debug_mode {
        warn!("Debug mode: CORS allows any origin");
        return CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods(cors::Any)
            .allow_headers(cors::Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        // Wildcard headers cannot be combined with credentials.
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
