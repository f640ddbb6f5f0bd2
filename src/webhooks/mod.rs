//! Webhook verification and translation.
//!
//! # Data Flow
//! ```text
//! raw body + <provider>-signature
//!     → signature.rs (Verify: HMAC over the exact bytes, timestamp window)
//!     → event.rs (Translate: event tag → method/path, payload → UserRecord)
//!     → upstream::relay (Relay: backend call with machine credentials)
//! ```
//!
//! Unverified payloads never reach translation.

pub mod event;
pub mod signature;

pub use event::{translate, EventKind, RelayPlan, Translation, UserRecord, WebhookEvent};
pub use signature::{sign, verify, SignatureError};
