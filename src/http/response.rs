//! Response handling for proxied calls.
//!
//! The backend body is re-chunked on its way back to the caller, so the
//! framing headers describing the backend's encoding would be wrong:
//! `content-encoding` (the client already decoded it), `content-length`
//! (the length may change), `transfer-encoding` (the server frames it
//! anew). Everything else passes through.

use axum::http::{
    header::{HeaderName, CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING},
    HeaderMap,
};

/// Backend response headers never forwarded to the caller.
pub const STRIPPED_RESPONSE_HEADERS: [HeaderName; 3] =
    [CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING];

/// Copy `headers`, dropping the framing headers. Multi-valued headers keep every value.
pub fn filter_response_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !STRIPPED_RESPONSE_HEADERS.contains(name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}
