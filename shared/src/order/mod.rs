//! Order domain
//!
//! - [`Order`]: the record, its line items and append-only status history
//! - [`transitions`]: the table of legal actions per status
//! - [`StatusChange`]: a conditional update the storage layer applies atomically
//! - request and response payloads of the order endpoints

pub mod otp;
pub mod request;
pub mod status;
pub mod transitions;
pub mod types;

// Re-exports
pub use otp::normalize_otp;
pub use request::*;
pub use status::OrderStatus;
pub use transitions::{OrderAction, TransitionError, allowed_actions, next_status};
pub use types::*;
