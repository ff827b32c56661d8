//! Shared types for PharmaFlow
//!
//! Wire and domain types used by the server and its clients: the unified
//! error system, user and medicine models, and the order domain with its
//! status transition table.

pub mod error;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
