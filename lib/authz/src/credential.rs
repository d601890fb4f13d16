//! Credentials presented with a request.
//!
//! Precedence is decided in one place, [`Credential::select`]:
//! 1. the shared administrative secret header, when the secret gate is open
//! 2. an `Authorization: Bearer` header
//! 3. the primary session cookie
//! 4. the legacy session cookie

use std::fmt;

/// Header carrying the shared administrative secret.
pub const API_SECRET_HEADER: &str = "x-api-secret";

/// Raw credential material pulled from a request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialSources {
    api_secret: Option<String>,
    authorization: Option<String>,
    session_cookie: Option<String>,
    legacy_cookie: Option<String>,
}

impl CredentialSources {
    /// Creates empty sources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the shared secret header value.
    #[must_use]
    pub fn with_api_secret(mut self, value: Option<impl Into<String>>) -> Self {
        self.api_secret = value.map(Into::into);
        self
    }

    /// Sets the `Authorization` header value.
    #[must_use]
    pub fn with_authorization(mut self, value: Option<impl Into<String>>) -> Self {
        self.authorization = value.map(Into::into);
        self
    }

    /// Sets the primary session cookie value.
    #[must_use]
    pub fn with_session_cookie(mut self, value: Option<impl Into<String>>) -> Self {
        self.session_cookie = value.map(Into::into);
        self
    }

    /// Sets the legacy session cookie value.
    #[must_use]
    pub fn with_legacy_cookie(mut self, value: Option<impl Into<String>>) -> Self {
        self.legacy_cookie = value.map(Into::into);
        self
    }

    /// Returns the bearer token from the header or either cookie, in order.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization
            .as_deref()
            .and_then(strip_bearer)
            .or_else(|| non_empty(self.session_cookie.as_deref()))
            .or_else(|| non_empty(self.legacy_cookie.as_deref()))
    }
}

impl fmt::Debug for CredentialSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSources")
            .field("api_secret", &self.api_secret.is_some())
            .field("authorization", &self.authorization.is_some())
            .field("session_cookie", &self.session_cookie.is_some())
            .field("legacy_cookie", &self.legacy_cookie.is_some())
            .finish()
    }
}

/// The single credential a request is judged by.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// A session token from a header or cookie.
    BearerToken(String),
    /// The shared administrative secret.
    SharedSecret(String),
    /// Nothing usable was presented.
    None,
}

impl Credential {
    /// Chooses the credential to evaluate.
    ///
    /// The secret header is only considered when `secret_gate_open` is true,
    /// meaning the route accepts the secret and secret mutations are enabled.
    /// Otherwise the header is ignored and token sources are used.
    #[must_use]
    pub fn select(sources: &CredentialSources, secret_gate_open: bool) -> Self {
        if secret_gate_open {
            if let Some(secret) = non_empty(sources.api_secret.as_deref()) {
                return Self::SharedSecret(secret.to_string());
            }
        }
        match sources.bearer_token() {
            Some(token) => Self::BearerToken(token.to_string()),
            None => Self::None,
        }
    }

    /// Returns the credential kind without its value.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BearerToken(_) => "bearer_token",
            Self::SharedSecret(_) => "shared_secret",
            Self::None => "none",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BearerToken(_) => f.write_str("BearerToken([REDACTED])"),
            Self::SharedSecret(_) => f.write_str("SharedSecret([REDACTED])"),
            Self::None => f.write_str("None"),
        }
    }
}

fn strip_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        non_empty(Some(token.trim()))
    } else {
        None
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
