//! Authentication API client methods

use super::{ApiClient, AuthMode, ClientError, RequestDescriptor};
use crate::types::{LoginRequest, SessionInfo, TokenPair};
use paydash_core::{Role, Session};
use tracing::{debug, info, warn};

impl ApiClient {
    /// Log in and store the returned credentials under `role`
    pub async fn login(
        &self,
        role: Role,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<TokenPair, ClientError> {
        let path = format!("{}/login", role.auth_prefix());
        let pair = self.credential_exchange(path, username, password).await?;
        self.session
            .save(Session::new(pair.clone().into(), role))
            .await?;
        info!(%role, "Logged in");
        Ok(pair)
    }

    /// Register a merchant account and store its credentials
    pub async fn register(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<TokenPair, ClientError> {
        let pair = self
            .credential_exchange("/auth/register".to_string(), username, password)
            .await?;
        self.session
            .save(Session::new(pair.clone().into(), Role::Merchant))
            .await?;
        info!("Registered merchant account");
        Ok(pair)
    }

    async fn credential_exchange(
        &self,
        path: String,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<TokenPair, ClientError> {
        let body = serde_json::to_value(LoginRequest {
            username: username.into(),
            password: password.into(),
        })?;
        let request = RequestDescriptor::post(path)
            .body(body)
            .auth(AuthMode::Anonymous)
            .without_refresh();
        self.request(request).await
    }

    /// Refresh the stored credentials now
    pub async fn refresh_session(&self) -> Result<TokenPair, ClientError> {
        let refresh_token = self.session.refresh_token().await?.ok_or_else(|| {
            ClientError::Unauthorized("no refresh token stored".to_string())
        })?;
        self.exchange_refresh_token(&refresh_token).await
    }

    /// Identity of the stored session, from the role's session endpoint
    pub async fn current_session(&self) -> Result<SessionInfo, ClientError> {
        let role = self.session.role().await?;
        let request = RequestDescriptor::get(format!("{}/session", role.auth_prefix()));
        self.request(request).await
    }

    /// Check the stored session against the API
    ///
    /// Returns `None` and clears the store when there is no access token,
    /// when the API rejects the session, or when it reports no identity.
    /// Session store failures are returned as errors.
    pub async fn verify_session(&self) -> Result<Option<SessionInfo>, ClientError> {
        if self.session.access_token().await?.is_none() {
            self.session.clear().await?;
            return Ok(None);
        }

        match self.current_session().await {
            Ok(info) if !info.id.is_empty() => Ok(Some(info)),
            Ok(_) => {
                debug!("Session endpoint returned no identity");
                self.session.clear().await?;
                Ok(None)
            }
            Err(ClientError::Session(e)) => Err(ClientError::Session(e)),
            Err(e) => {
                warn!("Session check failed, clearing credentials: {e}");
                self.session.clear().await?;
                Ok(None)
            }
        }
    }

    /// Forget the stored credentials
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.clear().await?;
        info!("Logged out");
        Ok(())
    }
}
