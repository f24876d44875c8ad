//! Backend calls that keep a session alive and detect suspension.

use std::future::Future;

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::backend::{Backend, BackendError};

const REFRESH_PATH: &str = "auth/refresh";
const STATUS_PATH: &str = "auth/status";

/// Substring of the backend's 401 message that marks a suspended account.
pub const SUSPENDED_MARKER: &str = "suspendu";

/// New access token returned by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResult {
    pub token: String,
    #[serde(deserialize_with = "deserialize_millis")]
    pub token_expires: i64,
}

/// Account state reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
    /// Transport error or an unexpected answer.
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("refresh rejected with status {0}")]
    Rejected(StatusCode),
    #[error(transparent)]
    Endpoint(#[from] BackendError),
    #[error("refreshed token is not a valid cookie value")]
    InvalidToken,
}

/// The two backend operations the session guard depends on.
pub trait SessionBackend {
    /// Exchange a refresh token for a new access token. Single attempt.
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<RefreshResult, RefreshError>> + Send;

    /// Ask the backend whether the account behind `token` is still usable.
    fn check_status(&self, token: &str) -> impl Future<Output = AccountStatus> + Send;
}

/// `SessionBackend` over HTTP.
#[derive(Clone, Debug)]
pub struct RefreshClient {
    backend: Backend,
}

impl RefreshClient {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

impl SessionBackend for RefreshClient {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResult, RefreshError> {
        let url = self.backend.endpoint(REFRESH_PATH)?;
        let response = self
            .backend
            .http()
            .post(url)
            .bearer_auth(refresh_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status));
        }
        Ok(response.json::<RefreshResult>().await?)
    }

    async fn check_status(&self, token: &str) -> AccountStatus {
        let url = match self.backend.endpoint(STATUS_PATH) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Status endpoint unavailable");
                return AccountStatus::Unknown;
            }
        };

        match self.backend.http().get(url).bearer_auth(token).send().await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                classify_status(status, &body)
            }
            Err(e) => {
                warn!(error = %e, "Status check failed");
                AccountStatus::Unknown
            }
        }
    }
}

/// Map a status endpoint answer to an account state.
pub fn classify_status(status: StatusCode, body: &str) -> AccountStatus {
    match status {
        StatusCode::OK => AccountStatus::Active,
        StatusCode::UNAUTHORIZED if is_suspension_message(body) => AccountStatus::Suspended,
        _ => AccountStatus::Unknown,
    }
}

/// Whether a backend error body carries the suspension marker in its `message`.
pub fn is_suspension_message(body: &str) -> bool {
    backend_message(body).is_some_and(|m| m.contains(SUSPENDED_MARKER))
}

/// The `message` field of a backend JSON error body.
pub fn backend_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body).ok()?.message
}

/// Accept a millisecond timestamp sent either as a JSON number or as a numeric string.
pub(crate) fn deserialize_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Millis::deserialize(deserializer)? {
        Millis::Int(v) => Ok(v),
        Millis::Float(v) if v.is_finite() => Ok(v as i64),
        Millis::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom("tokenExpires is not a timestamp")),
        Millis::Float(_) => Err(serde::de::Error::custom("tokenExpires is not finite")),
    }
}
