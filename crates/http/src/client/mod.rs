//! Paydash API client

pub mod analytics;
pub mod auth;
pub mod error;
pub mod merchant;
pub mod request;

pub use request::{AuthMode, RequestDescriptor};

use crate::types::{Envelope, TokenPair};
use error::ClientError;
use paydash_core::{ApiConfig, MemorySessionStore, SessionStore};
use reqwest::{Client, ClientBuilder, StatusCode, header};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Paydash API client
///
/// Cloning is cheap; clones share the HTTP connection pool and the session
/// store.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    refresh_path: String,
    session: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("refresh_path", &self.refresh_path)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new client with default configuration and an in-memory session
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Create a client from loaded configuration
    pub fn from_config(
        config: &ApiConfig,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, ClientError> {
        Self::builder()
            .base_url(&config.base_url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .refresh_path(&config.refresh_path)
            .session_store(session)
            .build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session store this client reads and writes
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Send a request and return the envelope's `data`
    ///
    /// A 401 on an eligible request (see [`RequestDescriptor::may_refresh`])
    /// with a stored refresh token triggers one refresh call; on success the
    /// request is replayed once with the new access token and the replay's
    /// outcome is returned. A failed refresh is returned as-is. Every other
    /// failure is returned unchanged.
    #[instrument(
        name = "api_request",
        skip_all,
        fields(method = %request.method(), path = request.path())
    )]
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<T, ClientError> {
        match self.send(&request).await {
            Err(error) if error.is_unauthorized() => self.refresh_and_replay(&request, error).await,
            result => result,
        }
    }

    async fn refresh_and_replay<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
        unauthorized: ClientError,
    ) -> Result<T, ClientError> {
        if !request.may_refresh() {
            debug!(
                retry = request.is_retry(),
                "401 on a request that may not refresh"
            );
            return Err(unauthorized);
        }

        let Some(refresh_token) = self.session.refresh_token().await? else {
            debug!("401 with no refresh token stored");
            return Err(unauthorized);
        };

        let pair = match self.exchange_refresh_token(&refresh_token).await {
            Ok(pair) => pair,
            Err(error) => {
                warn!("Token refresh failed: {error}");
                return Err(error);
            }
        };

        debug!("Replaying request with refreshed access token");
        self.send(&request.retry_with(pair.access_token)).await
    }

    /// Trade a refresh token for a new pair and store it
    pub(crate) async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenPair, ClientError> {
        let refresh = RequestDescriptor::post(self.refresh_path.clone())
            .auth(AuthMode::Bearer(refresh_token.to_string()))
            .without_refresh();

        let pair: TokenPair = self.send(&refresh).await?;
        self.session.replace_credentials(pair.clone().into()).await?;
        debug!("Stored refreshed credentials");
        Ok(pair)
    }

    /// Build and send a single attempt, no recovery
    async fn send<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> Result<T, ClientError> {
        let token = match request.auth_mode() {
            AuthMode::Session => self.session.access_token().await?,
            AuthMode::Bearer(token) => Some(token.clone()),
            AuthMode::Anonymous => None,
        };

        let url = format!("{}{}", self.base_url, request.path());
        let mut builder = self.client.request(request.method().clone(), url);

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.json_body() {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        self.execute(builder).await
    }

    /// Execute a request and unwrap the response envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
            debug!(
                status = envelope.status_code,
                message = %envelope.message,
                "API response"
            );
            Ok(envelope.data)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, error_message(status, &body)))
        }
    }
}

/// Pull the human readable message out of an error body
///
/// The API reports errors inside the usual envelope; `message` may be a
/// string or a list of validation messages.
fn error_message(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| match value.get("message")? {
            serde_json::Value::String(message) => Some(message.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        });

    match message {
        Some(message) if !message.is_empty() => message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status.to_string(),
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    refresh_path: Option<String>,
    session: Option<Arc<dyn SessionStore>>,
}

impl ApiClientBuilder {
    /// Set the base URL, including the API prefix
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the token refresh endpoint (defaults to `/auth/refresh`)
    #[must_use]
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Set where credentials are kept (defaults to memory)
    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session = Some(store);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base_url is empty".into()));
        }

        let refresh_path = self
            .refresh_path
            .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string());
        if !refresh_path.starts_with('/') {
            return Err(ClientError::Configuration(
                "refresh_path must start with '/'".into(),
            ));
        }

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| concat!("paydash-client/", env!("CARGO_PKG_VERSION")).into()),
        );

        let client = client_builder.build()?;

        Ok(ApiClient {
            client,
            base_url,
            refresh_path,
            session: self
                .session
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
        })
    }
}
