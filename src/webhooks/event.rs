//! Webhook event translation.
//!
//! Maps a verified provider event onto a backend call and projects the
//! provider's user object into the backend's minimal user record, so the
//! backend never sees the provider's schema.

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::upstream::is_safe_path_segment;

/// Envelope of an inbound webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// User object as the identity provider sends it.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    email: String,
    #[serde(rename = "createdAt", alias = "created_at")]
    created_at: String,
}

/// Normalized user record sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

/// Event types the relay acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    UserCreated,
    UserUpdated,
    UserDeleted,
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "user.created" => Some(Self::UserCreated),
            "user.updated" => Some(Self::UserUpdated),
            "user.deleted" => Some(Self::UserDeleted),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserCreated => "user.created",
            Self::UserUpdated => "user.updated",
            Self::UserDeleted => "user.deleted",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Self::UserCreated => Method::POST,
            Self::UserUpdated => Method::PATCH,
            Self::UserDeleted => Method::DELETE,
        }
    }
}

/// A backend call derived from one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPlan {
    pub kind: EventKind,
    pub method: Method,
    /// Backend path, always starting with `/`.
    pub path: String,
    pub body: UserRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Relay(RelayPlan),
    /// Unrecognized event type; acknowledged without a backend call.
    Skip,
}

/// Translate a verified event.
pub fn translate(event: &WebhookEvent) -> Result<Translation, RelayError> {
    let Some(kind) = EventKind::from_tag(&event.event) else {
        return Ok(Translation::Skip);
    };

    let user: ProviderUser = serde_json::from_value(event.data.clone())
        .map_err(|e| RelayError::InvalidPayload(format!("{}: {e}", kind.as_str())))?;

    if !is_safe_path_segment(&user.id) {
        return Err(RelayError::InvalidPayload(format!(
            "{}: user id is not a valid path segment",
            kind.as_str()
        )));
    }

    let path = match kind {
        EventKind::UserCreated => "/user".to_string(),
        EventKind::UserUpdated | EventKind::UserDeleted => format!("/user/{}", user.id),
    };

    Ok(Translation::Relay(RelayPlan {
        kind,
        method: kind.method(),
        path,
        body: UserRecord {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        },
    }))
}
