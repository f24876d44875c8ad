//! Session cookie parsing and `Set-Cookie` rendering.

use axum::http::{HeaderMap, HeaderValue, header};

pub const TOKEN_COOKIE: &str = "token";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const TOKEN_EXPIRES_COOKIE: &str = "tokenExpires";
pub const LAST_REFRESH_CHECK_COOKIE: &str = "lastRefreshCheck";
pub const USER_STATUS_COOKIE: &str = "userStatus";

/// Every cookie owned by the session, in the order they are cleared at logout.
pub const SESSION_COOKIES: [&str; 5] = [
    TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
    TOKEN_EXPIRES_COOKIE,
    LAST_REFRESH_CHECK_COOKIE,
    USER_STATUS_COOKIE,
];

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Whether `value` can be stored verbatim as a cookie value (RFC 6265 cookie-octets).
pub fn is_cookie_value(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
        })
}

/// Account state remembered in the `userStatus` cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Suspended,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// Snapshot of the session cookies carried by one request.
///
/// Empty values count as absent, matching what logout leaves behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires: Option<String>,
    pub last_refresh_check: Option<String>,
    pub user_status: Option<UserStatus>,
}

impl SessionCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name| {
            get_cookie(headers, name)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            token: read(TOKEN_COOKIE),
            refresh_token: read(REFRESH_TOKEN_COOKIE),
            token_expires: read(TOKEN_EXPIRES_COOKIE),
            last_refresh_check: read(LAST_REFRESH_CHECK_COOKIE),
            user_status: get_cookie(headers, USER_STATUS_COOKIE).and_then(UserStatus::parse),
        }
    }
}

/// Attribute set used when rendering a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieStyle {
    /// Written by the session guard: `HttpOnly; Path=/` only.
    Plain,
    /// Written at login: adds `SameSite=Lax` and optionally `Secure`.
    Login { secure: bool },
    /// Removal: empty value with an expiry in the past.
    Cleared,
}

/// One pending `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieWrite {
    pub name: &'static str,
    pub value: String,
    pub style: CookieStyle,
}

impl CookieWrite {
    pub fn plain(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            style: CookieStyle::Plain,
        }
    }

    pub fn login(name: &'static str, value: impl Into<String>, secure: bool) -> Self {
        Self {
            name,
            value: value.into(),
            style: CookieStyle::Login { secure },
        }
    }

    pub fn cleared(name: &'static str) -> Self {
        Self {
            name,
            value: String::new(),
            style: CookieStyle::Cleared,
        }
    }

    pub fn to_header_string(&self) -> String {
        match self.style {
            CookieStyle::Plain => format!("{}={}; HttpOnly; Path=/", self.name, self.value),
            CookieStyle::Login { secure } => format!(
                "{}={}; HttpOnly; Path=/; SameSite=Lax{}",
                self.name,
                self.value,
                if secure { "; Secure" } else { "" }
            ),
            CookieStyle::Cleared => format!(
                "{}=; HttpOnly; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
                self.name
            ),
        }
    }
}

/// Append one `Set-Cookie` header per write.
pub fn append_set_cookies(headers: &mut HeaderMap, writes: &[CookieWrite]) {
    for write in writes {
        match HeaderValue::from_str(&write.to_header_string()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!(cookie = write.name, "Dropping cookie with invalid value"),
        }
    }
}

/// Writes that remove every session cookie.
pub fn clear_session() -> Vec<CookieWrite> {
    SESSION_COOKIES.into_iter().map(CookieWrite::cleared).collect()
}
