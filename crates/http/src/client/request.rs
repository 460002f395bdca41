//! Immutable description of an outbound API call

use reqwest::Method;
use serde_json::Value as JsonValue;

/// How the `Authorization` header is chosen
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Attach the stored access token when one exists
    Session,
    /// Attach this token
    Bearer(String),
    /// Send no credentials
    Anonymous,
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session => f.write_str("Session"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// An API call the client can send, and replay once after a token refresh
///
/// Descriptors are never mutated once built. A replay is a new descriptor
/// derived with [`RequestDescriptor::retry_with`], which carries the retry
/// flag so a second 401 is returned to the caller instead of refreshing again.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<JsonValue>,
    auth: AuthMode,
    refreshable: bool,
    is_retry: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: AuthMode::Session,
            refreshable: true,
            is_retry: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Set the JSON body
    #[must_use]
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    /// Never attempt a token refresh when this request gets a 401
    ///
    /// Used by login, register and the refresh call itself.
    #[must_use]
    pub const fn without_refresh(mut self) -> Self {
        self.refreshable = false;
        self
    }

    /// Derive the one-time replay of this request with a fresh access token
    #[must_use]
    pub fn retry_with(&self, access_token: impl Into<String>) -> Self {
        Self {
            auth: AuthMode::Bearer(access_token.into()),
            is_retry: true,
            ..self.clone()
        }
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub const fn json_body(&self) -> Option<&JsonValue> {
        self.body.as_ref()
    }

    pub const fn auth_mode(&self) -> &AuthMode {
        &self.auth
    }

    pub const fn is_retry(&self) -> bool {
        self.is_retry
    }

    /// A 401 on this request may be recovered by refreshing, provided a
    /// refresh token is stored
    pub const fn may_refresh(&self) -> bool {
        self.refreshable && !self.is_retry
    }
}
