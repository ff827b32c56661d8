//! Authentication and authorization
//!
//! - [`JwtService`] - bearer token issue/validation
//! - [`CurrentUser`] - per-request caller identity (extractor)
//! - [`require_auth`] / [`require_admin`] - router middleware
//! - [`require_role`] - role guard for handlers and the workflow
//! - [`require_clearance`] - active and verified account guard
//! - [`password`] - Argon2 hashing

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{require_admin, require_auth, require_clearance, require_role};
