//! Cookie-backed restaurateur sessions.
//!
//! The access token, its refresh token and its expiry live in HttpOnly
//! cookies. A middleware inspects them on every page request and refreshes
//! the access token against the backend before it goes stale.

mod client;
mod cookie;
mod guard;
mod middleware;
mod token;

pub use client::{
    AccountStatus, RefreshClient, RefreshError, RefreshResult, SUSPENDED_MARKER, SessionBackend,
    backend_message, classify_status, is_suspension_message,
};
pub(crate) use client::deserialize_millis;
pub use cookie::{
    CookieStyle, CookieWrite, LAST_REFRESH_CHECK_COOKIE, REFRESH_TOKEN_COOKIE, SESSION_COOKIES,
    SessionCookies, TOKEN_COOKIE, TOKEN_EXPIRES_COOKIE, USER_STATUS_COOKIE, UserStatus,
    append_set_cookies, clear_session, get_cookie, is_cookie_value,
};
pub use guard::{
    Decision, Evaluation, GuardConfig, GuardError, GuardOutcome, REFRESH_COOLDOWN_MS,
    REFRESH_FRACTION, SessionGuard, now_millis,
};
pub use middleware::{GuardState, is_guarded_path, session_guard};
pub use token::{TokenError, issued_at};
