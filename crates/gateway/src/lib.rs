//! HTTP gateway for Doppel.
//!
//! Exposes the response pipeline and the feedback/analytics sinks over a
//! small JSON API under `/api`. Built on Axum.

pub mod api;
pub mod rate_limit;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use doppel_agent::Pipeline;
use doppel_config::AppConfig;
use doppel_core::EventSink;
use doppel_store::Store;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::rate_limit::{RateLimiter, rate_limit_middleware};

/// Request bodies above this are rejected with 413.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state.
pub struct GatewayState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<dyn Store>,
    /// Kill switch. When off, `/api/chat` answers with the maintenance
    /// message and the pipeline is never called.
    pub chat_enabled: AtomicBool,
}

impl GatewayState {
    pub fn new(pipeline: Arc<Pipeline>, store: Arc<dyn Store>, chat_enabled: bool) -> Self {
        Self {
            pipeline,
            store,
            chat_enabled: AtomicBool::new(chat_enabled),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the router with every route and layer.
pub fn build_router(state: SharedState, gateway: &doppel_config::GatewayConfig) -> Router {
    let limiter = Arc::new(RateLimiter::per_minute(gateway.rate_limit_per_minute));

    let chat = Router::new()
        .route("/chat", post(api::chat_handler))
        .route_layer(middleware::from_fn(move |req, next| {
            rate_limit_middleware(limiter.clone(), req, next)
        }));

    let api = Router::new()
        .route("/feedback", post(api::feedback_handler))
        .route("/analytics", post(api::analytics_handler))
        .route("/health", get(api::health_handler))
        .merge(chat);

    Router::new()
        .route("/", get(api::root_handler))
        .nest("/api", api)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&gateway.allowed_origins)),
        )
}

/// CORS for the configured origins. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the HTTP server and run until it fails.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let router = doppel_providers::build_from_config(&config)?;
    let provider = router
        .default()
        .ok_or_else(|| format!("Provider '{}' is not configured", config.provider))?;

    let store = doppel_store::open(&config.store).await?;
    let sink: Arc<dyn EventSink> = store.clone();
    let pipeline = Arc::new(Pipeline::from_config(&config, provider, sink)?);

    let state = Arc::new(GatewayState::new(
        pipeline,
        store,
        config.gateway.chat_enabled,
    ));
    let app = build_router(state, &config.gateway);

    info!(
        addr = %addr,
        chat_enabled = config.gateway.chat_enabled,
        store = %config.store.backend,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
