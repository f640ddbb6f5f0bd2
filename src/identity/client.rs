//! Identity token client.
//!
//! Signs a JWT assertion with the service account key and exchanges it at the
//! credential's token endpoint for an identity token scoped to the backend
//! audience. The token is reused until it is within the refresh margin of its
//! expiry.

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::identity::{IdentityError, ServiceAccountKey};
use crate::observability::metrics;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    target_audience: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
}

struct CachedToken {
    value: String,
    expires_at: i64,
}

/// Produces identity tokens for one target audience.
pub struct IdTokenClient {
    client_email: String,
    token_uri: String,
    audience: String,
    header: Header,
    key: EncodingKey,
    http: reqwest::Client,
    refresh_margin_secs: i64,
    token: RwLock<Option<CachedToken>>,
}

impl IdTokenClient {
    /// Build a client from a decoded key. Fails if the private key is not a usable RSA PEM.
    pub fn new(
        key: ServiceAccountKey,
        audience: impl Into<String>,
        http: reqwest::Client,
        refresh_margin: Duration,
    ) -> Result<Self, IdentityError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| IdentityError::Signing(e.to_string()))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key.private_key_id.clone();

        Ok(Self {
            client_email: key.client_email,
            token_uri: key.token_uri,
            audience: audience.into(),
            header,
            key: encoding_key,
            http,
            refresh_margin_secs: i64::try_from(refresh_margin.as_secs()).unwrap_or(i64::MAX),
            token: RwLock::new(None),
        })
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Current identity token, exchanging a fresh one when needed.
    pub async fn id_token(&self) -> Result<String, IdentityError> {
        let now = Utc::now().timestamp();

        if let Some(token) = self.token.read().await.as_ref() {
            if self.is_fresh(token, now) {
                return Ok(token.value.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = slot.as_ref() {
            if self.is_fresh(token, now) {
                return Ok(token.value.clone());
            }
        }

        let value = match self.exchange(now).await {
            Ok(value) => {
                metrics::record_identity_refresh("success");
                value
            }
            Err(e) => {
                metrics::record_identity_refresh("failure");
                return Err(e);
            }
        };
        let expires_at = token_expiry(&value).unwrap_or(now + ASSERTION_LIFETIME_SECS);

        tracing::debug!(
            audience = %self.audience,
            expires_in = expires_at.saturating_sub(now),
            "Identity token refreshed"
        );

        *slot = Some(CachedToken {
            value: value.clone(),
            expires_at,
        });
        Ok(value)
    }

    /// Headers asserting machine identity toward the audience.
    pub async fn request_headers(&self) -> Result<HeaderMap, IdentityError> {
        let token = self.id_token().await?;
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| IdentityError::InvalidToken)?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    fn is_fresh(&self, token: &CachedToken, now: i64) -> bool {
        token.expires_at.saturating_sub(self.refresh_margin_secs) > now
    }

    fn sign_assertion(&self, now: i64) -> Result<String, IdentityError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            sub: &self.client_email,
            aud: &self.token_uri,
            target_audience: &self.audience,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&self.header, &claims, &self.key)
            .map_err(|e| IdentityError::Signing(e.to_string()))
    }

    async fn exchange(&self, now: i64) -> Result<String, IdentityError> {
        let assertion = self.sign_assertion(now)?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| IdentityError::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Exchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Exchange(format!("malformed token response: {e}")))?;
        Ok(parsed.id_token)
    }
}

/// Read the `exp` claim of a JWT without verifying it.
fn token_expiry(token: &str) -> Option<i64> {
    #[derive(Deserialize)]
    struct Expiry {
        exp: i64,
    }

    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Expiry>(&bytes).ok().map(|claims| claims.exp)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{extract::State, routing::post, Form, Json, Router};
    use jsonwebtoken::{DecodingKey, Validation};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    pub(crate) const TEST_PRIVATE_KEY: &str =
        include_str!("../../tests/fixtures/service_account_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../../tests/fixtures/service_account_pub.pem");

    #[derive(Default)]
    struct TokenEndpoint {
        calls: AtomicUsize,
        assertions: Mutex<Vec<HashMap<String, String>>>,
        lifetime_secs: i64,
    }

    pub(crate) fn fake_id_token(exp: i64) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(serde_json::json!({ "exp": exp }).to_string())
        )
    }

    async fn issue(
        State(endpoint): State<Arc<TokenEndpoint>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        endpoint.calls.fetch_add(1, Ordering::SeqCst);
        endpoint.assertions.lock().unwrap().push(form);
        let exp = Utc::now().timestamp() + endpoint.lifetime_secs;
        Json(serde_json::json!({ "id_token": fake_id_token(exp) }))
    }

    async fn start_token_endpoint(lifetime_secs: i64) -> (String, Arc<TokenEndpoint>) {
        let endpoint = Arc::new(TokenEndpoint {
            lifetime_secs,
            ..Default::default()
        });
        let app = Router::new()
            .route("/token", post(issue))
            .with_state(endpoint.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/token"), endpoint)
    }

    fn key_for(token_uri: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "relay@project.iam.gserviceaccount.com".into(),
            private_key: TEST_PRIVATE_KEY.into(),
            private_key_id: Some("kid-1".into()),
            token_uri: token_uri.into(),
        }
    }

    #[test]
    fn test_oversized_refresh_margin_never_counts_as_fresh() {
        let client = IdTokenClient::new(
            key_for("http://127.0.0.1:1/token"),
            "https://api",
            reqwest::Client::new(),
            Duration::from_secs(u64::MAX),
        )
        .unwrap();
        let now = Utc::now().timestamp();

        for expires_at in [i64::MIN, 0, now + 3600, i64::MAX] {
            let token = CachedToken {
                value: "t".into(),
                expires_at,
            };
            assert!(!client.is_fresh(&token, now), "{expires_at}");
        }
    }

    #[test]
    fn test_rejects_unusable_private_key() {
        let mut key = key_for("http://127.0.0.1:1/token");
        key.private_key = "not a pem".into();
        let result = IdTokenClient::new(key, "https://api", reqwest::Client::new(), Duration::from_secs(300));
        assert!(matches!(result, Err(IdentityError::Signing(_))));
    }

    #[test]
    fn test_token_expiry_reads_exp_claim() {
        assert_eq!(token_expiry(&fake_id_token(1_700_000_000)), Some(1_700_000_000));
        assert_eq!(token_expiry("opaque-token"), None);
    }

    #[tokio::test]
    async fn test_token_is_reused_until_near_expiry() {
        let (token_uri, endpoint) = start_token_endpoint(3600).await;
        let client = IdTokenClient::new(
            key_for(&token_uri),
            "https://api.example.com",
            reqwest::Client::new(),
            Duration::from_secs(300),
        )
        .unwrap();

        let first = client.id_token().await.unwrap();
        let second = client.id_token().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_inside_refresh_margin_is_exchanged_again() {
        let (token_uri, endpoint) = start_token_endpoint(60).await;
        let client = IdTokenClient::new(
            key_for(&token_uri),
            "https://api.example.com",
            reqwest::Client::new(),
            Duration::from_secs(300),
        )
        .unwrap();

        client.id_token().await.unwrap();
        client.id_token().await.unwrap();
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_assertion_is_signed_for_target_audience() {
        #[derive(Debug, Clone, Deserialize)]
        struct Claims {
            iss: String,
            target_audience: String,
        }

        let (token_uri, endpoint) = start_token_endpoint(3600).await;
        let client = IdTokenClient::new(
            key_for(&token_uri),
            "https://api.example.com",
            reqwest::Client::new(),
            Duration::from_secs(300),
        )
        .unwrap();

        let headers = client.request_headers().await.unwrap();
        let auth = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(auth.starts_with("Bearer "));

        let form = endpoint.assertions.lock().unwrap()[0].clone();
        assert_eq!(form["grant_type"], JWT_BEARER_GRANT);

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[token_uri.as_str()]);
        let decoded = jsonwebtoken::decode::<Claims>(
            &form["assertion"],
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.header.kid.as_deref(), Some("kid-1"));
        assert_eq!(decoded.claims.iss, "relay@project.iam.gserviceaccount.com");
        assert_eq!(decoded.claims.target_audience, "https://api.example.com");
    }

    #[tokio::test]
    async fn test_exchange_failure_is_reported() {
        let app = Router::new().route(
            "/token",
            post(|| async { (axum::http::StatusCode::BAD_REQUEST, "invalid_grant") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = IdTokenClient::new(
            key_for(&format!("http://{addr}/token")),
            "https://api.example.com",
            reqwest::Client::new(),
            Duration::from_secs(300),
        )
        .unwrap();

        let err = client.id_token().await.unwrap_err();
        assert!(matches!(err, IdentityError::Exchange(ref msg) if msg.contains("invalid_grant")));
    }
}
