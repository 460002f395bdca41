//! Session credential storage
//!
//! The client reads the stored access token on every outbound request and
//! replaces the whole credential pair after login, register or refresh. A
//! store never exposes a half-written pair: `save` and `replace_credentials`
//! swap the entire session in one step.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Which endpoint family a session belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular merchant account (`/auth/*`)
    #[default]
    Merchant,
    /// Platform administrator (`/admin/*`)
    Admin,
}

impl Role {
    /// Path prefix of the login/session endpoints for this role
    pub const fn auth_prefix(self) -> &'static str {
        match self {
            Self::Merchant => "/auth",
            Self::Admin => "/admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merchant => f.write_str("merchant"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

/// Access/refresh token pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Credentials that cannot be refreshed
    pub fn access_only(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// The single active session of a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub credentials: Credentials,
    #[serde(default)]
    pub role: Role,
}

impl Session {
    pub const fn new(credentials: Credentials, role: Role) -> Self {
        Self { credentials, role }
    }
}

/// Persistent holder of the client's session
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the current session, if any
    async fn load(&self) -> CoreResult<Option<Session>>;

    /// Replace the stored session
    async fn save(&self, session: Session) -> CoreResult<()>;

    /// Replace only the credential pair, keeping the stored role
    ///
    /// With no stored session this stores a merchant session.
    async fn replace_credentials(&self, credentials: Credentials) -> CoreResult<()>;

    /// Forget the session
    async fn clear(&self) -> CoreResult<()>;

    /// Stored access token, if any
    async fn access_token(&self) -> CoreResult<Option<String>> {
        Ok(self.load().await?.map(|s| s.credentials.access_token))
    }

    /// Stored refresh token, if any
    async fn refresh_token(&self) -> CoreResult<Option<String>> {
        Ok(self.load().await?.and_then(|s| s.credentials.refresh_token))
    }

    /// Role of the stored session, merchant when nothing is stored
    async fn role(&self) -> CoreResult<Role> {
        Ok(self.load().await?.map(|s| s.role).unwrap_or_default())
    }
}

/// Session store kept in process memory
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a session
    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> CoreResult<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: Session) -> CoreResult<()> {
        *self.session.write().await = Some(session);
        Ok(())
    }

    async fn replace_credentials(&self, credentials: Credentials) -> CoreResult<()> {
        let mut guard = self.session.write().await;
        let role = guard.as_ref().map(|s| s.role).unwrap_or_default();
        *guard = Some(Session::new(credentials, role));
        Ok(())
    }

    async fn clear(&self) -> CoreResult<()> {
        *self.session.write().await = None;
        Ok(())
    }
}

/// Session store backed by a JSON file
///
/// Each write goes to its own temporary file in the same directory which is
/// then renamed over the target, so readers in any process see either the
/// old or the new session.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> CoreResult<Option<Session>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let session = serde_json::from_slice(&bytes).map_err(|e| {
                    CoreError::session_error(format!(
                        "corrupt session file {}: {e}",
                        self.path.display()
                    ))
                })?;
                Ok(Some(session))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, session: &Session) -> CoreResult<()> {
        let content = serde_json::to_vec_pretty(session)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || persist_atomically(&path, &content))
            .await
            .map_err(|e| CoreError::session_error(format!("session writer failed: {e}")))??;

        debug!(path = %self.path.display(), role = %session.role, "Session written");
        Ok(())
    }
}

/// Write `content` to a uniquely named sibling of `path` and rename it into
/// place. Each writer gets its own temp file.
fn persist_atomically(path: &Path, content: &[u8]) -> CoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".session-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CoreError::from(e.error))?;
    Ok(())
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> CoreResult<Option<Session>> {
        self.read_file().await
    }

    async fn save(&self, session: Session) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_file(&session).await
    }

    async fn replace_credentials(&self, credentials: Credentials) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let role = self.read_file().await?.map(|s| s.role).unwrap_or_default();
        self.write_file(&Session::new(credentials, role)).await
    }

    async fn clear(&self) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
