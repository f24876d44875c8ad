//! Shared handle to the GoodFood backend REST API.

use std::time::Duration;

use url::Url;

/// Path prefix of every restaurateur endpoint on the backend.
const API_PREFIX: &str = "restaurateur/api";

/// Errors raised while building backend requests.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid backend endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("path leaves the backend API root: {0}")]
    OutsideApi(String),
}

/// Pooled HTTP client bound to the backend base URL.
///
/// Cloning is cheap; all clones share the same connection pool.
#[derive(Clone, Debug)]
pub struct Backend {
    http: reqwest::Client,
    base_url: Url,
}

impl Backend {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolve `path` below `/restaurateur/api/` on the backend.
    ///
    /// Any path prefix already present in the base URL is preserved. The
    /// parser normalizes `\`, `..` and `%2e%2e` segments, so the resolved path
    /// must still sit below the API root.
    pub fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.contains(['\\', '?', '#']) {
            return Err(BackendError::OutsideApi(path.to_string()));
        }

        let root = Url::parse(&format!("{}/{}/", base, API_PREFIX))?;
        let url = Url::parse(&format!("{}{}", root, path))?;
        if !url.path().starts_with(root.path()) {
            return Err(BackendError::OutsideApi(path.to_string()));
        }
        Ok(url)
    }
}
