mod aggregate;
mod auth;
mod error;
mod proxy;

use axum::{Router, http::HeaderMap};

use crate::backend::Backend;
use crate::session::{TOKEN_COOKIE, get_cookie};

pub use error::{ApiError, ResultExt};

/// State shared by every API route.
#[derive(Clone)]
pub struct ApiState {
    pub backend: Backend,
    /// Whether login cookies carry the Secure flag.
    pub secure_cookies: bool,
}

/// Create the API router.
pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        .nest("/auth", auth::router(state.clone()))
        .nest("/backend", proxy::router(state.clone()))
        .nest("/aggregate", aggregate::router(state))
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// Access token of the calling restaurateur, required by every backend call.
fn require_token(headers: &HeaderMap) -> Result<String, ApiError> {
    get_cookie(headers, TOKEN_COOKIE)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
}
