//! Order API Module
//!
//! | Path | Method | Role |
//! |------|--------|------|
//! | /orders/place | POST | customer |
//! | /orders/approve | POST | pharmacist |
//! | /orders/pack | POST | pharmacist |
//! | /orders/assign-delivery | POST | pharmacist |
//! | /orders/confirm-delivery | POST | delivery |
//! | /orders/cancel | POST | customer, admin |
//! | /orders/return | POST | customer |
//! | /orders | GET | any |
//! | /orders/{id} | GET | any, scoped |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router (behind `require_auth`)
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/orders", get(handler::list))
        .route("/orders/{id}", get(handler::get_by_id))
        .route("/orders/place", post(handler::place))
        .route("/orders/approve", post(handler::approve))
        .route("/orders/pack", post(handler::pack))
        .route("/orders/assign-delivery", post(handler::assign_delivery))
        .route("/orders/confirm-delivery", post(handler::confirm_delivery))
        .route("/orders/cancel", post(handler::cancel))
        .route("/orders/return", post(handler::return_order))
}
