//! Backend auth service client.
//!
//! The backend exposes two JSON endpoints relative to its base URL:
//! - `POST api/auth/login` exchanges a provider credential for a profile and app data
//! - `POST api/auth/sync` stores app data for the credential's user

use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sessionkit_config::Config;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use url::Url;

/// Login endpoint, relative to the backend base URL.
pub const LOGIN_PATH: &str = "api/auth/login";

/// Sync endpoint, relative to the backend base URL.
pub const SYNC_PATH: &str = "api/auth/sync";

/// Status value the backend uses for an accepted credential.
pub const STATUS_SUCCESS: &str = "success";

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Profile of the signed-in user as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Any other fields the backend sends.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Stable user identifier: `id`, else the provider subject (`sub`).
    pub fn user_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.extra.get("sub").and_then(|v| v.as_str()))
    }
}

/// Opaque application state exchanged with the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppData(pub serde_json::Value);

impl AppData {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// True when the payload has no keys.
    ///
    /// Objects, arrays and strings are empty at length zero. Scalars and
    /// null carry no keys and always count as empty.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Array(items) => items.is_empty(),
            serde_json::Value::String(s) => s.is_empty(),
            serde_json::Value::Null
            | serde_json::Value::Bool(_)
            | serde_json::Value::Number(_) => true,
        }
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for AppData {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Request body for the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub credential: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Response body of the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AppData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Human-readable rejection reason.
    pub fn rejection_reason(&self) -> String {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or("Unknown server error")
            .to_string()
    }

    /// Returned app data, if any and not empty.
    pub fn non_empty_data(&self) -> Option<&AppData> {
        self.data.as_ref().filter(|d| !d.is_empty())
    }
}

/// Request body for the sync endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub credential: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub data: serde_json::Value,
}

/// Backend auth service.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange a credential. Any parsed body is returned, whatever its status;
    /// only transport and decoding problems are errors.
    async fn login(&self, request: &LoginRequest) -> AuthResult<LoginResponse>;

    /// Store app data for the credential's user.
    async fn sync(&self, request: &SyncRequest) -> AuthResult<()>;
}

/// reqwest-backed [`AuthBackend`].
#[derive(Clone)]
pub struct HttpAuthBackend {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpAuthBackend {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http_client: reqwest::Client, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    /// Create a client using the base URL resolved from configuration.
    pub fn from_config(config: &Config) -> AuthResult<Self> {
        Ok(Self::new(config.backend_base_url()?))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint below the base URL, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> AuthResult<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, request: &LoginRequest) -> AuthResult<LoginResponse> {
        let url = self.endpoint(LOGIN_PATH)?;
        tracing::debug!(url = %url, "Exchanging credential with backend");

        let response = self.http_client.post(url).json(request).send().await?;

        // The body decides the outcome; rejections may arrive with 4xx codes.
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<LoginResponse>(&body) {
            Ok(parsed) => {
                tracing::debug!(
                    http_status = %status,
                    status = %parsed.status,
                    "Backend answered login"
                );
                Ok(parsed)
            }
            Err(e) => {
                tracing::error!(
                    http_status = %status,
                    body_summary = %summarize_response_body(&body),
                    "Unreadable login response"
                );
                Err(AuthError::Json(e))
            }
        }
    }

    async fn sync(&self, request: &SyncRequest) -> AuthResult<()> {
        let url = self.endpoint(SYNC_PATH)?;
        tracing::debug!(url = %url, "Syncing data to backend");

        let response = self.http_client.post(url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body_summary = %summarize_response_body(&body),
                "Sync rejected by backend"
            );
            return Err(AuthError::SyncRejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
