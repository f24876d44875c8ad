//! Authenticated passthrough to the backend REST API.
//!
//! `/{*path}` is forwarded to `/restaurateur/api/{path}` with the session's
//! access token as bearer credential. Method, query string, content type and
//! raw body are relayed as-is, so JSON calls and multipart image uploads take
//! the same route.

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, RawQuery, State},
    http::{HeaderMap, Method, header},
    response::{IntoResponse, Response},
    routing::any,
};
use tracing::debug;

use super::error::{ApiError, ResultExt};
use super::{ApiState, require_token};
use crate::backend::BackendError;

/// Upper bound on forwarded bodies (image uploads).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/{*path}", any(forward))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn forward(
    State(state): State<ApiState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let token = require_token(&headers)?;
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(ApiError::bad_request("Invalid backend path"));
    }

    let mut url = state.backend.endpoint(&path).map_err(|e| match e {
        BackendError::OutsideApi(_) => ApiError::bad_request("Invalid backend path"),
        e => ApiError::backend_error("Invalid backend path", e),
    })?;
    url.set_query(query.as_deref());

    debug!(method = %method, path = %path, "Forwarding to backend");
    let mut request = state
        .backend
        .http()
        .request(method, url)
        .bearer_auth(token);
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type.clone());
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = request.send().await.backend_err("Backend request failed")?;
    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = upstream
        .bytes()
        .await
        .backend_err("Failed to read backend response")?;

    let mut response = (status, bytes).into_response();
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}
