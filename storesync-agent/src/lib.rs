pub mod config;
mod error;
pub mod helpers;
pub mod host;
pub mod http;
pub mod presence;
mod routes;
mod validation;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use storesync_core::StoreSync;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

pub use error::{AppError, ErrorResponse};
pub use host::{BridgeHost, Dispatch};
pub use http::HttpStoreApi;
pub use presence::{PlayerSession, Presence};

/// The sync engine wired to the HTTP store backend and the bridge host.
pub type Engine = StoreSync<HttpStoreApi, BridgeHost>;

pub struct AppState {
    pub engine: Arc<Engine>,
    /// SHA-256 of the bridge token, compared against every bearer token.
    pub token_hash: String,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, bridge_token: &str) -> Self {
        Self {
            engine,
            token_hash: helpers::hash_token(bridge_token),
        }
    }
}

/// Create the bridge router the game server talks to
pub fn create_app(
    state: Arc<AppState>,
    request_body_limit: usize,
    request_timeout: Duration,
) -> Router {
    // Presence updates from the game server
    let player_routes = Router::new()
        .route("/join", post(routes::join))
        .route("/leave", post(routes::leave))
        .route("/sync", post(routes::sync));

    // Command delivery and store actions
    let store_routes = Router::new()
        .route("/commands", get(routes::commands))
        .route("/packages", get(routes::packages))
        .route("/checkout", post(routes::checkout))
        .route("/ban", post(routes::ban))
        .route("/users/{player}", get(routes::lookup))
        .route("/triage", post(routes::triage));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(player_routes)
        .merge(store_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .with_state(state)
}
