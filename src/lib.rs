pub mod api;
pub mod backend;
pub mod cli;
pub mod pages;
pub mod session;

use api::{ApiState, create_api_router};
use axum::{Router, middleware};
use backend::{Backend, BackendError};
use session::{GuardConfig, GuardState, RefreshClient, SessionGuard, session_guard};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

pub struct ServerConfig {
    /// Base URL of the GoodFood backend (e.g., "http://localhost:8080")
    pub backend_url: Url,
    /// Whether to set Secure flag on login cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Timeout applied to every outbound backend request
    pub request_timeout: Duration,
    /// Session guard tunables
    pub guard: GuardConfig,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Result<Router, BackendError> {
    let backend = Backend::new(config.backend_url.clone(), config.request_timeout)?;

    let guard_state = GuardState {
        guard: Arc::new(SessionGuard::new(config.guard.clone())),
        client: RefreshClient::new(backend.clone()),
    };

    let api_router = create_api_router(ApiState {
        backend,
        secure_cookies: config.secure_cookies,
    });

    Ok(Router::new()
        .nest("/api", api_router)
        .merge(pages::router())
        .layer(middleware::from_fn_with_state(guard_state, session_guard)))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config).map_err(std::io::Error::other)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
