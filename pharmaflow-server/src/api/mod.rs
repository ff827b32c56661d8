//! HTTP API
//!
//! # Structure
//!
//! - [`health`] - liveness
//! - [`auth`] - register, login, current user
//! - [`orders`] - placement, transitions, listings
//! - [`medicines`] - catalogue
//! - [`admin`] - account verification and activation
//! - [`upload`] - prescription and verification documents
//! - [`extract`] - JSON and query extractors with the unified error body

pub mod admin;
pub mod auth;
pub mod extract;
pub mod health;
pub mod medicines;
pub mod orders;
pub mod upload;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_middleware;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppError;
use crate::auth::require_auth;
use crate::core::ServerState;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the fully configured application.
///
/// Public routes are merged next to the protected router; only the latter
/// carries `require_auth`.
pub fn build_app(state: ServerState) -> Router {
    let protected = Router::new()
        .merge(auth::router())
        .merge(orders::router())
        .merge(medicines::router())
        .merge(upload::router())
        .merge(admin::router())
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .merge(health::router())
        .merge(auth::public_router())
        .merge(upload::public_router())
        .merge(protected)
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn fallback() -> AppError {
    AppError::not_found("Route")
}
