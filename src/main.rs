use std::net::SocketAddr;

use clap::Parser;
use goodfood_gate::cli::{Args, build_config, init_logging, validate_backend_url};
use goodfood_gate::create_app;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(backend_url) = validate_backend_url(&args.backend_url) else {
        std::process::exit(1);
    };

    let config = build_config(backend_url, args.secure_cookies, args.request_timeout_secs);
    let app = create_app(&config).unwrap_or_else(|e| {
        error!(error = %e, "Failed to initialize backend client");
        std::process::exit(1);
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(
            address = %local_addr,
            backend = %config.backend_url,
            "Listening"
        ),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
