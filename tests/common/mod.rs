#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use goodfood_gate::{ServerConfig, create_app, session::GuardConfig};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use url::Url;

pub const HOUR_MS: i64 = 3_600_000;
pub const REFRESH_TOKEN: &str = "refresh-1";
pub const FRESH_TOKEN: &str = "fresh.access.token";
pub const ORDER_PAGES: u32 = 3;
pub const ORDERS_PER_PAGE: u32 = 2;

/// Requests observed by the fake backend.
#[derive(Default, Debug)]
pub struct BackendLog {
    pub refresh_calls: usize,
    pub status_tokens: Vec<String>,
    pub login_calls: usize,
    pub order_pages: Vec<u32>,
    pub stats_calls: usize,
    pub outside_api_calls: usize,
}

/// How the fake backend answers session calls.
#[derive(Clone, Debug)]
pub struct Behaviour {
    pub refresh_ok: bool,
    pub status_code: u16,
    pub status_body: &'static str,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            refresh_ok: true,
            status_code: 200,
            status_body: r#"{"status":"active"}"#,
        }
    }
}

impl Behaviour {
    pub fn suspended() -> Self {
        Self {
            status_code: 401,
            status_body: r#"{"message":"Votre compte est suspendu"}"#,
            ..Self::default()
        }
    }

    pub fn failing_refresh() -> Self {
        Self {
            refresh_ok: false,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
struct FakeState {
    behaviour: Behaviour,
    log: Arc<Mutex<BackendLog>>,
}

/// Backend stand-in served on an ephemeral local port.
pub struct FakeBackend {
    pub url: Url,
    log: Arc<Mutex<BackendLog>>,
    _server: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    pub async fn spawn(behaviour: Behaviour) -> Self {
        let log = Arc::new(Mutex::new(BackendLog::default()));
        let state = FakeState {
            behaviour,
            log: log.clone(),
        };

        let app = Router::new()
            .route("/restaurateur/api/auth/refresh", post(refresh))
            .route("/restaurateur/api/auth/status", get(status))
            .route("/restaurateur/api/auth/login", post(login))
            .route("/restaurateur/api/restaurants/{id}/orders", get(orders))
            .route("/restaurateur/api/restaurants/{id}/stats/revenue", get(revenue))
            .route("/restaurateur/api/restaurants/{id}/stats/orders", get(order_stats))
            .route(
                "/restaurateur/api/restaurants/{id}/stats/popular-items",
                get(popular_items),
            )
            .route("/restaurateur/api/restaurants/{id}/reviews/stats", get(review_stats))
            .route("/restaurateur/api/menus/{*rest}", any(echo))
            .route("/admin/{*rest}", any(outside_api))
            .route("/restaurateur/admin/{*rest}", any(outside_api))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            url: Url::parse(&format!("http://{}", addr)).expect("Invalid URL"),
            log,
            _server: server,
        }
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, BackendLog> {
        self.log.lock().unwrap()
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn refresh(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    state.log.lock().unwrap().refresh_calls += 1;
    if !state.behaviour.refresh_ok || bearer(&headers).as_deref() != Some(REFRESH_TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Refresh token invalide"})),
        )
            .into_response();
    }
    Json(json!({"token": FRESH_TOKEN, "tokenExpires": now_ms() + HOUR_MS})).into_response()
}

async fn status(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    let token = bearer(&headers).unwrap_or_default();
    state.log.lock().unwrap().status_tokens.push(token);
    (
        StatusCode::from_u16(state.behaviour.status_code).unwrap(),
        state.behaviour.status_body,
    )
        .into_response()
}

async fn login(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    state.log.lock().unwrap().login_calls += 1;
    match (body["email"].as_str(), body["password"].as_str()) {
        (Some("chef@goodfood.test"), Some("secret")) => Json(json!({
            "token": mint_token(now_ms() / 1000),
            "refreshToken": REFRESH_TOKEN,
            "tokenExpires": now_ms() + HOUR_MS,
        }))
        .into_response(),
        (Some("banned@goodfood.test"), _) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Compte suspendu par un administrateur"})),
        )
            .into_response(),
        (Some("odd@goodfood.test"), _) => Json(json!({
            "token": "abc; Domain=evil.example",
            "refreshToken": REFRESH_TOKEN,
            "tokenExpires": now_ms() + HOUR_MS,
        }))
        .into_response(),
        (Some("broken@goodfood.test"), _) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Identifiants invalides"})),
        )
            .into_response(),
    }
}

async fn orders(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if bearer(&headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    state.log.lock().unwrap().order_pages.push(page);

    if id == "broken" && page == 2 {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let data: Vec<Value> = (0..ORDERS_PER_PAGE)
        .map(|i| json!({"id": format!("{}-{}-{}", id, page, i), "page": page}))
        .collect();
    Json(json!({"data": data, "page": page, "totalPages": ORDER_PAGES})).into_response()
}

async fn revenue(State(state): State<FakeState>) -> Json<Value> {
    state.log.lock().unwrap().stats_calls += 1;
    Json(json!({"total": 1250.5}))
}

async fn order_stats(State(state): State<FakeState>) -> Json<Value> {
    state.log.lock().unwrap().stats_calls += 1;
    Json(json!({"count": 42}))
}

async fn popular_items(State(state): State<FakeState>) -> StatusCode {
    state.log.lock().unwrap().stats_calls += 1;
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn review_stats(State(state): State<FakeState>) -> Json<Value> {
    state.log.lock().unwrap().stats_calls += 1;
    Json(json!({"average": 4.5}))
}

async fn outside_api(State(state): State<FakeState>) -> &'static str {
    state.log.lock().unwrap().outside_api_calls += 1;
    "outside"
}

async fn echo(
    Path(rest): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if rest == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Menu introuvable"})))
            .into_response();
    }
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "path": rest,
        "query": query,
        "authorization": header_str(header::AUTHORIZATION),
        "contentType": header_str(header::CONTENT_TYPE),
        "body": String::from_utf8_lossy(&body),
    }))
    .into_response()
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// Signed access token with the given issue time (seconds).
pub fn mint_token(iat_secs: i64) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &json!({"sub": "restaurateur-7", "iat": iat_secs, "exp": iat_secs + 3600}),
        &EncodingKey::from_secret(b"fake-backend-secret"),
    )
    .unwrap()
}

/// Cookie header for a one-hour session issued `age_ms` ago.
pub fn session_cookie(age_ms: i64) -> String {
    let issued = now_ms() - age_ms;
    format!(
        "token={}; refreshToken={}; tokenExpires={}",
        mint_token(issued / 1000),
        REFRESH_TOKEN,
        issued + HOUR_MS
    )
}

pub fn create_test_app(backend: &FakeBackend) -> Router {
    create_test_app_with(backend, false)
}

pub fn create_test_app_with(backend: &FakeBackend, secure_cookies: bool) -> Router {
    let config = ServerConfig {
        backend_url: backend.url.clone(),
        secure_cookies,
        request_timeout: Duration::from_secs(5),
        guard: GuardConfig::default(),
    };
    create_app(&config).expect("Failed to create app")
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Value written for `name`, if the response sets it.
pub fn set_cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies.iter().find_map(|c| {
        c.strip_prefix(&prefix)
            .map(|rest| rest.split(';').next().unwrap_or("").to_string())
    })
}

pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
