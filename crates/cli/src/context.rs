//! Client construction from configuration

use anyhow::{Context, Result};
use paydash_core::{FileSessionStore, PaydashConfig, StateDir};
use paydash_http::ApiClient;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load configuration and build a client whose session lives on disk
pub fn build_client(state_dir: &StateDir, config_path: &Path) -> Result<ApiClient> {
    let config = PaydashConfig::load(Some(config_path))
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let session_path = config
        .session
        .file
        .clone()
        .unwrap_or_else(|| state_dir.session_path());
    debug!(
        base_url = %config.api.base_url,
        session = %session_path.display(),
        "Building API client"
    );

    let store = Arc::new(FileSessionStore::new(session_path));
    ApiClient::from_config(&config.api, store).context("Failed to build API client")
}
