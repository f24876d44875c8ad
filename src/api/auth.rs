//! Session API endpoints.
//!
//! - POST `/login` - Authenticate against the backend and store the session cookies
//! - POST `/logout` - Clear every session cookie

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ApiState;
use super::error::{ApiError, ResultExt};
use crate::session::{
    CookieWrite, REFRESH_TOKEN_COOKIE, TOKEN_COOKIE, TOKEN_EXPIRES_COOKIE, USER_STATUS_COOKIE,
    UserStatus, append_set_cookies, backend_message, clear_session, deserialize_millis,
    is_cookie_value, is_suspension_message,
};

const LOGIN_PATH: &str = "auth/login";

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Debug, Deserialize, Serialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Credentials issued by the backend login endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginSession {
    token: String,
    refresh_token: String,
    #[serde(deserialize_with = "deserialize_millis")]
    token_expires: i64,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Serialize)]
struct SuspendedResponse {
    error: String,
    suspended: bool,
}

async fn login(
    State(state): State<ApiState>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let url = state
        .backend
        .endpoint(LOGIN_PATH)
        .backend_err("Invalid login endpoint")?;
    let response = state
        .backend
        .http()
        .post(url)
        .json(&credentials)
        .send()
        .await
        .backend_err("Login request failed")?;

    let status = response.status();
    if status.is_success() {
        let session: LoginSession = response
            .json()
            .await
            .backend_err("Invalid login response")?;
        if !is_cookie_value(&session.token) || !is_cookie_value(&session.refresh_token) {
            return Err(ApiError::backend_error(
                "Invalid login response",
                "credentials are not valid cookie values",
            ));
        }

        let secure = state.secure_cookies;
        let cookies = [
            CookieWrite::login(TOKEN_COOKIE, session.token, secure),
            CookieWrite::login(REFRESH_TOKEN_COOKIE, session.refresh_token, secure),
            CookieWrite::login(
                TOKEN_EXPIRES_COOKIE,
                session.token_expires.to_string(),
                secure,
            ),
            CookieWrite::login(USER_STATUS_COOKIE, UserStatus::Active.as_str(), secure),
        ];

        info!("Restaurateur logged in");
        let mut response = Json(SuccessResponse { success: true }).into_response();
        append_set_cookies(response.headers_mut(), &cookies);
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let suspended = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        && is_suspension_message(&body);
    let message = backend_message(&body);

    if suspended {
        info!("Login refused for suspended account");
        let mut response = (
            StatusCode::FORBIDDEN,
            Json(SuspendedResponse {
                error: message.unwrap_or_else(|| "Account suspended".to_string()),
                suspended: true,
            }),
        )
            .into_response();
        append_set_cookies(
            response.headers_mut(),
            &[CookieWrite::login(
                USER_STATUS_COOKIE,
                UserStatus::Suspended.as_str(),
                state.secure_cookies,
            )],
        );
        return Ok(response);
    }

    warn!(status = %status, "Login rejected by backend");
    if status.is_server_error() {
        return Err(ApiError::bad_gateway("Authentication service unavailable"));
    }
    Err(ApiError::unauthorized(
        message.unwrap_or_else(|| "Invalid credentials".to_string()),
    ))
}

async fn logout() -> Response {
    info!("Restaurateur logged out");
    let mut response = Json(SuccessResponse { success: true }).into_response();
    append_set_cookies(response.headers_mut(), &clear_session());
    response
}
