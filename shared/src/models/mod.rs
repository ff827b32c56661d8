//! Data models
//!
//! Shared between the server and its API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are opaque strings (uuid v4).

pub mod medicine;
pub mod role;
pub mod user;

// Re-exports
pub use medicine::*;
pub use role::*;
pub use user::*;
