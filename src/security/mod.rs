//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → session.rs (resolve the caller's access token)
//!     → headers.rs (forwarded-auth / internal key / machine identity merge)
//!     → outbound call
//! ```
//!
//! # Design Decisions
//! - Fail closed: no token, no proxied call
//! - Machine identity always takes precedence over forwarded credentials

pub mod headers;
pub mod session;

pub use headers::{merge_identity_headers, X_FORWARDED_AUTHORIZATION, X_INTERNAL_API_KEY};
pub use session::{HeaderSessionResolver, SessionResolver};
