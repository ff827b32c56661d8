//! PharmaFlow server - pharmacy order workflow over an HTTP JSON API
//!
//! # Module layout
//!
//! ```text
//! pharmaflow-server/src/
//! ├── core/          # config, state, server runner
//! ├── auth/          # JWT, password hashing, request authentication
//! ├── db/            # storage ports, in-memory and PostgreSQL adapters
//! ├── services/      # payment, geocoding and document adapters
//! ├── orders/        # order workflow engine
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # logging, input validation
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod orders;
pub mod services;
pub mod utils;

// Re-export common types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::OrderWorkflow;
pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Security event logging, routed to the `security` target.
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
