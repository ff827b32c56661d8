//! Admin routes
//!
//! | Path | Method |
//! |------|--------|
//! | /admin/users?role=&verification= | GET |
//! | /admin/users/{id}/verification | POST |
//! | /admin/users/{id}/active | POST |
//!
//! Every route requires the admin role ([`require_admin`]).

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/admin/users", get(handler::list_users))
        .route("/admin/users/{id}/verification", post(handler::set_verification))
        .route("/admin/users/{id}/active", post(handler::set_active))
        .route_layer(middleware::from_fn(require_admin))
}
