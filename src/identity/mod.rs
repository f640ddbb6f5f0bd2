//! Machine identity subsystem.
//!
//! # Data Flow
//! ```text
//! GCP_BASE_64_JSON
//!     → credentials.rs (base64 → service account JSON)
//!     → client.rs (RS256 assertion → token endpoint → identity token, cached until near expiry)
//!     → cache.rs (one client per process, built lazily on first use)
//!     → Authorization: Bearer <identity token> on outbound production calls
//! ```
//!
//! Only used in production mode; development calls go out without machine identity.

pub mod cache;
pub mod client;
pub mod credentials;

use thiserror::Error;

pub use cache::IdentityTokenCache;
pub use client::IdTokenClient;
pub use credentials::ServiceAccountKey;

/// Errors produced while building or using the machine identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("machine credential is not configured (GCP_BASE_64_JSON)")]
    MissingCredential,

    #[error("target audience is not configured (API_URL)")]
    MissingAudience,

    #[error("machine credential could not be decoded: {0}")]
    Decode(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("identity token is not a valid header value")]
    InvalidToken,
}
