//! Authentication Routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /auth/register | POST | none |
//! | /auth/login | POST | none |
//! | /auth/me | GET | bearer |

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

/// Routes reachable without a token
pub fn public_router() -> Router<ServerState> {
    Router::new()
        .route("/auth/register", post(handler::register))
        .route("/auth/login", post(handler::login))
}

/// Routes behind `require_auth`
pub fn router() -> Router<ServerState> {
    Router::new().route("/auth/me", get(handler::me))
}
