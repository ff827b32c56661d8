//! Core: configuration, shared state, process errors and the server runner
//!
//! - [`Config`] - environment configuration
//! - [`ServerState`] - repositories and services shared by handlers
//! - [`Server`] - HTTP listener
//! - [`ServerError`] - startup errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
