//! Medicine catalogue routes
//!
//! | Path | Method | Role |
//! |------|--------|------|
//! | /medicines | GET | any |
//! | /medicines | POST | pharmacist, admin |
//! | /medicines/{id} | GET | any |
//! | /medicines/{id}/stock | POST | pharmacist, admin |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/medicines", get(handler::search).post(handler::create))
        .route("/medicines/{id}", get(handler::get_by_id))
        .route("/medicines/{id}/stock", post(handler::set_stock))
}
