//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use crate::ServerConfig;
use crate::session::GuardConfig;
use clap::Parser;
use tracing::error;
use url::Url;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "goodfood-gate",
    about = "Session gateway for the GoodFood restaurateur dashboard"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Base URL of the GoodFood backend API
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:8080")]
    pub backend_url: String,

    /// Set the Secure flag on login cookies (enable behind HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Timeout in seconds for each backend request
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout_secs: u64,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Parse and validate the backend URL.
/// Returns None and logs an error if validation fails.
pub fn validate_backend_url(backend_url: &str) -> Option<Url> {
    let url = match Url::parse(backend_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %backend_url, error = %e, "Invalid backend URL");
            return None;
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        error!(url = %backend_url, "Backend URL must use http or https");
        return None;
    }

    if url.query().is_some() || url.fragment().is_some() {
        error!(url = %backend_url, "Backend URL must not carry a query or fragment");
        return None;
    }

    Some(url)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(backend_url: Url, secure_cookies: bool, request_timeout_secs: u64) -> ServerConfig {
    ServerConfig {
        backend_url,
        secure_cookies,
        request_timeout: Duration::from_secs(request_timeout_secs),
        guard: GuardConfig::default(),
    }
}
