//! Axum middleware applying the session guard to page requests.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::client::RefreshClient;
use super::cookie::{SessionCookies, append_set_cookies};
use super::guard::{Decision, SessionGuard, now_millis};

/// Leading path segments never intercepted: API routes, build assets and the
/// pages a signed-out or suspended user must still reach.
const UNGUARDED_PREFIXES: [&str; 6] = [
    "/api",
    "/_next/static",
    "/_next/image",
    "/favicon.ico",
    "/auth",
    "/notallowed",
];

/// Whether `path` goes through the session guard.
pub fn is_guarded_path(path: &str) -> bool {
    !UNGUARDED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

#[derive(Clone)]
pub struct GuardState {
    pub guard: Arc<SessionGuard>,
    pub client: RefreshClient,
}

/// Gate every guarded request on the session cookies, refreshing the
/// access token when it is close to expiry.
pub async fn session_guard(
    State(state): State<GuardState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !is_guarded_path(&path) {
        return next.run(request).await;
    }

    let cookies = SessionCookies::from_headers(request.headers());
    let outcome = state
        .guard
        .run(&path, &cookies, now_millis(), &state.client)
        .await;
    tracing::debug!(path = %path, decision = ?outcome.decision, "Session checked");

    let config = state.guard.config();
    let mut response = match outcome.decision {
        Decision::PassThrough => next.run(request).await,
        Decision::RedirectToLogin => Redirect::temporary(&config.login_path).into_response(),
        Decision::RedirectToSuspended => {
            Redirect::temporary(&config.suspended_path).into_response()
        }
    };
    append_set_cookies(response.headers_mut(), &outcome.cookies);
    response
}
