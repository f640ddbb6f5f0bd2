//! Outbound header construction.
//!
//! Precedence is explicit: machine identity headers replace any header of
//! the same name already present, so a forwarded user credential can never
//! shadow the relay's own identity.

use axum::http::{
    header::{CONTENT_TYPE, HeaderName},
    HeaderMap, HeaderValue,
};

/// Carries the end user's bearer token to the backend.
pub const X_FORWARDED_AUTHORIZATION: HeaderName =
    HeaderName::from_static("x-forwarded-authorization");

/// Carries the shared secret on machine-to-machine webhook relays.
pub const X_INTERNAL_API_KEY: HeaderName = HeaderName::from_static("x-internal-api-key");

/// Base headers for a JSON call made on behalf of a user.
///
/// Returns `None` if the token cannot be represented as a header value.
pub fn user_headers(token: Option<&str>) -> Option<HeaderMap> {
    let mut headers = json_headers();
    if let Some(token) = token {
        headers.insert(X_FORWARDED_AUTHORIZATION, HeaderValue::from_str(token).ok()?);
    }
    Some(headers)
}

/// Base headers for a machine-to-machine relay.
pub fn internal_headers(secret: &str) -> Option<HeaderMap> {
    let mut headers = json_headers();
    headers.insert(X_INTERNAL_API_KEY, HeaderValue::from_str(secret).ok()?);
    Some(headers)
}

/// Merge machine identity headers into `base`. Identity wins on collision;
/// every value of a colliding name is replaced, not appended.
pub fn merge_identity_headers(base: &mut HeaderMap, identity: HeaderMap) {
    let mut current: Option<HeaderName> = None;
    for (name, value) in identity {
        // `HeaderMap::into_iter` yields the name only on the first value of each entry.
        if let Some(name) = name {
            base.remove(&name);
            current = Some(name);
        }
        if let Some(name) = &current {
            base.append(name.clone(), value);
        }
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}
