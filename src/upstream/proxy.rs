//! Streaming proxy.
//!
//! Request bodies are handed to the outbound call as a live stream and the
//! backend's response body is returned as a live stream; neither is
//! buffered, so memory stays bounded regardless of payload size.

use axum::{
    body::Body,
    http::{HeaderValue, Response},
};

use crate::error::RelayError;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::filter_response_headers;
use crate::security::headers::user_headers;
use crate::upstream::{BackendClient, ProxyMethod};

/// One inbound request to be forwarded.
pub struct ForwardedRequest {
    pub method: ProxyMethod,
    /// Backend path, with or without a leading slash.
    pub endpoint: String,
    /// The caller's access token, if one was resolved.
    pub token: Option<String>,
    pub body: Body,
    pub request_id: Option<HeaderValue>,
}

impl BackendClient {
    /// Forward `request` and stream the backend response back.
    ///
    /// Pre-flight failures (configuration, missing token, identity) return
    /// before any outbound call. Transport failures become 502.
    pub async fn proxy(&self, request: ForwardedRequest) -> Result<Response<Body>, RelayError> {
        let target_url = self.target_url(&request.endpoint)?;
        let token = request.token.ok_or(RelayError::Unauthorized)?;

        let mut headers = user_headers(Some(token.as_str())).ok_or(RelayError::Unauthorized)?;
        if let Some(request_id) = request.request_id {
            headers.insert(X_REQUEST_ID, request_id);
        }
        self.apply_identity(&mut headers).await?;

        let method = request.method.as_method();
        let mut outbound = self.http.request(method.clone(), &target_url).headers(headers);
        if request.method.has_body() {
            outbound = outbound.body(reqwest::Body::wrap_stream(request.body.into_data_stream()));
        }

        tracing::debug!(method = %method, endpoint = %request.endpoint, "Proxying request");

        let response = outbound.send().await.map_err(|e| {
            RelayError::Upstream(format!("{method} {}: {e}", request.endpoint))
        })?;

        let status = response.status();
        let headers = filter_response_headers(response.headers());

        tracing::debug!(
            method = %method,
            endpoint = %request.endpoint,
            status = status.as_u16(),
            "Backend responded"
        );

        let mut relayed = Response::new(Body::from_stream(response.bytes_stream()));
        *relayed.status_mut() = status;
        *relayed.headers_mut() = headers;
        Ok(relayed)
    }
}
