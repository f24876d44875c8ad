//! Per-request session gate.
//!
//! The session has no in-memory representation: every decision is rebuilt
//! from the request's cookies and the current time. [`SessionGuard::evaluate`]
//! is a pure function of those inputs; only the refresh step talks to the
//! backend, through a [`SessionBackend`].
//!
//! Evaluation order:
//! 1. bypass paths pass through untouched
//! 2. a remembered suspension redirects to the suspended page
//! 3. incomplete credentials redirect to login
//! 4. a recent refresh check passes through (cooldown)
//! 5. otherwise the token is refreshed once less than a fraction of its
//!    lifetime remains

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use super::client::{AccountStatus, RefreshError, SessionBackend};
use super::cookie::{
    CookieWrite, LAST_REFRESH_CHECK_COOKIE, SessionCookies, TOKEN_COOKIE, TOKEN_EXPIRES_COOKIE,
    USER_STATUS_COOKIE, UserStatus, is_cookie_value,
};
use super::token::{TokenError, issued_at};

/// Minimum spacing between two refresh evaluations for the same client.
pub const REFRESH_COOLDOWN_MS: i64 = 30_000;

/// Refresh once less than this share of the token lifetime remains.
pub const REFRESH_FRACTION: f64 = 0.1;

/// Tunables of the session guard.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub cooldown_ms: i64,
    pub refresh_fraction: f64,
    pub login_path: String,
    pub suspended_path: String,
    /// Paths that stay reachable whatever the session state.
    pub bypass_paths: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: REFRESH_COOLDOWN_MS,
            refresh_fraction: REFRESH_FRACTION,
            login_path: "/auth".to_string(),
            suspended_path: "/notallowed".to_string(),
            bypass_paths: vec!["/notallowed".to_string(), "/api/auth/logout".to_string()],
        }
    }
}

/// Why a request could not continue with its current session.
///
/// Refresh failures are fatal for the request; status-check failures are not.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuardError {
    #[error("session cookies are incomplete")]
    MissingCredentials,
    #[error("session token is malformed: {0}")]
    MalformedToken(String),
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("account status could not be determined")]
    StatusCheckFailed,
    #[error("account is suspended")]
    AccountSuspended,
}

impl From<TokenError> for GuardError {
    fn from(e: TokenError) -> Self {
        Self::MalformedToken(e.to_string())
    }
}

/// Terminal decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    PassThrough,
    RedirectToLogin,
    RedirectToSuspended,
}

/// Decision plus the cookies to write on the outgoing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub decision: Decision,
    pub cookies: Vec<CookieWrite>,
}

impl GuardOutcome {
    fn pass(cookies: Vec<CookieWrite>) -> Self {
        Self {
            decision: Decision::PassThrough,
            cookies,
        }
    }

    fn to_login() -> Self {
        Self {
            decision: Decision::RedirectToLogin,
            cookies: Vec::new(),
        }
    }

    fn to_suspended(cookies: Vec<CookieWrite>) -> Self {
        Self {
            decision: Decision::RedirectToSuspended,
            cookies,
        }
    }
}

/// Result of the pure evaluation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Decided without contacting the backend.
    Done(GuardOutcome),
    /// Too little lifetime left; the token must be refreshed.
    Refresh {
        refresh_token: String,
        /// The `lastRefreshCheck` stamp, written whatever the refresh yields.
        stamp: CookieWrite,
    },
}

/// Milliseconds since the Unix epoch according to the wall clock.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub struct SessionGuard {
    config: GuardConfig,
}

impl SessionGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    fn is_bypassed(&self, path: &str) -> bool {
        self.config.bypass_paths.iter().any(|p| p == path)
    }

    /// Decide everything that can be decided from the cookies and `now_ms` alone.
    pub fn evaluate(&self, path: &str, cookies: &SessionCookies, now_ms: i64) -> Evaluation {
        if self.is_bypassed(path) {
            return Evaluation::Done(GuardOutcome::pass(Vec::new()));
        }

        if cookies.user_status == Some(UserStatus::Suspended) {
            debug!(path, "Known suspended account");
            return Evaluation::Done(GuardOutcome::to_suspended(Vec::new()));
        }

        let (Some(token), Some(refresh_token), Some(token_expires)) = (
            cookies.token.as_deref(),
            cookies.refresh_token.as_deref(),
            cookies.token_expires.as_deref(),
        ) else {
            debug!(path, reason = %GuardError::MissingCredentials, "Redirecting to login");
            return Evaluation::Done(GuardOutcome::to_login());
        };

        if let Some(last_check) = cookies
            .last_refresh_check
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
        {
            if now_ms - last_check < self.config.cooldown_ms {
                return Evaluation::Done(GuardOutcome::pass(Vec::new()));
            }
        }

        let (remaining, threshold) = match self.freshness(token, token_expires, now_ms) {
            Ok(window) => window,
            Err(e) => {
                debug!(path, reason = %e, "Redirecting to login");
                return Evaluation::Done(GuardOutcome::to_login());
            }
        };

        let stamp = CookieWrite::plain(LAST_REFRESH_CHECK_COOKIE, now_ms.to_string());
        if remaining >= threshold {
            return Evaluation::Done(GuardOutcome::pass(vec![stamp]));
        }

        debug!(path, remaining, threshold, "Access token close to expiry");
        Evaluation::Refresh {
            refresh_token: refresh_token.to_string(),
            stamp,
        }
    }

    /// Remaining time and refresh threshold, both in milliseconds.
    fn freshness(
        &self,
        token: &str,
        token_expires: &str,
        now_ms: i64,
    ) -> Result<(f64, f64), GuardError> {
        let iat = issued_at(token)?;
        if iat == 0 {
            return Err(GuardError::MalformedToken("iat claim is zero".to_string()));
        }

        let expires = token_expires
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GuardError::MalformedToken("tokenExpires is not a number".into()))?;

        // An expiry before the issue time yields a non-positive threshold:
        // the token is kept while unexpired and refreshed once it is not.
        let lifetime = expires - iat as f64 * 1000.0;
        let remaining = expires - now_ms as f64;
        Ok((remaining, lifetime * self.config.refresh_fraction))
    }

    /// Run the full guard, refreshing through `backend` when needed.
    pub async fn run<B: SessionBackend>(
        &self,
        path: &str,
        cookies: &SessionCookies,
        now_ms: i64,
        backend: &B,
    ) -> GuardOutcome {
        match self.evaluate(path, cookies, now_ms) {
            Evaluation::Done(outcome) => outcome,
            Evaluation::Refresh {
                refresh_token,
                stamp,
            } => refresh_session(backend, &refresh_token, stamp).await,
        }
    }
}

async fn refresh_session<B: SessionBackend>(
    backend: &B,
    refresh_token: &str,
    stamp: CookieWrite,
) -> GuardOutcome {
    let refreshed = match backend.refresh(refresh_token).await.and_then(|r| {
        if is_cookie_value(&r.token) {
            Ok(r)
        } else {
            Err(RefreshError::InvalidToken)
        }
    }) {
        Ok(refreshed) => refreshed,
        Err(e) => {
            warn!(reason = %GuardError::RefreshFailed(e.to_string()), "Redirecting to login");
            return GuardOutcome::to_login();
        }
    };

    info!(expires = refreshed.token_expires, "Access token refreshed");
    let mut cookies = vec![
        stamp,
        CookieWrite::plain(TOKEN_COOKIE, refreshed.token.as_str()),
        CookieWrite::plain(TOKEN_EXPIRES_COOKIE, refreshed.token_expires.to_string()),
    ];

    match backend.check_status(&refreshed.token).await {
        AccountStatus::Suspended => {
            info!(reason = %GuardError::AccountSuspended, "Redirecting to suspended page");
            cookies.push(CookieWrite::plain(
                USER_STATUS_COOKIE,
                UserStatus::Suspended.as_str(),
            ));
            GuardOutcome::to_suspended(cookies)
        }
        AccountStatus::Active => {
            cookies.push(CookieWrite::plain(
                USER_STATUS_COOKIE,
                UserStatus::Active.as_str(),
            ));
            GuardOutcome::pass(cookies)
        }
        AccountStatus::Unknown => {
            warn!(reason = %GuardError::StatusCheckFailed, "Continuing without status update");
            GuardOutcome::pass(cookies)
        }
    }
}
