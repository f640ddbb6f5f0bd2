//! User session resolution.
//!
//! The identity provider owns session issuance; the relay only needs the
//! caller's access token so it can be forwarded to the backend.

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};

use crate::config::SessionConfig;

/// Resolves the bearer token of the user making an inbound request.
pub trait SessionResolver: Send + Sync {
    fn access_token(&self, headers: &HeaderMap) -> Option<String>;
}

/// Reads `Authorization: Bearer <token>`, falling back to a named cookie.
#[derive(Debug, Clone, Default)]
pub struct HeaderSessionResolver {
    cookie_name: Option<String>,
}

impl HeaderSessionResolver {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
        }
    }

    fn from_cookie(&self, headers: &HeaderMap) -> Option<String> {
        let name = self.cookie_name.as_deref()?;
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim().to_string())
    }
}

impl SessionResolver for HeaderSessionResolver {
    fn access_token(&self, headers: &HeaderMap) -> Option<String> {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                v.strip_prefix("Bearer ")
                    .or_else(|| v.strip_prefix("bearer "))
            })
            .map(str::trim)
            .map(str::to_string);

        bearer
            .or_else(|| self.from_cookie(headers))
            .filter(|token| !token.is_empty())
    }
}
