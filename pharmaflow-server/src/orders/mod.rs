//! Order workflow
//!
//! ```text
//! handler -> OrderWorkflow -> role / clearance / FSM checks
//!                          -> OrderRepository::apply_status_change (conditional)
//! ```

pub mod workflow;

pub use workflow::OrderWorkflow;
