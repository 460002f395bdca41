//! Platform-specific state directory management

use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::warn;

/// Manages platform-specific application directories
pub struct StateDir {
    /// Project directories from the directories crate
    project_dirs: Option<ProjectDirs>,
    /// Override directory for testing or custom installations
    override_dir: Option<PathBuf>,
}

impl StateDir {
    /// Create a new StateDir instance
    pub fn new() -> Self {
        let project_dirs = ProjectDirs::from("com", "Paydash", "paydash");
        if project_dirs.is_none() {
            warn!("Failed to determine platform-specific directories, will use fallback");
        }
        Self {
            project_dirs,
            override_dir: None,
        }
    }

    /// Create a new StateDir with an override directory
    pub fn with_override(path: impl Into<PathBuf>) -> Self {
        Self {
            project_dirs: None,
            override_dir: Some(path.into()),
        }
    }

    /// Resolve from an explicit directory, `PAYDASH_STATE_DIR`, or the platform default
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        explicit
            .or_else(|| std::env::var_os("PAYDASH_STATE_DIR").map(PathBuf::from))
            .map_or_else(Self::new, Self::with_override)
    }

    /// Get the configuration directory
    pub fn config_dir(&self) -> PathBuf {
        if let Some(override_dir) = &self.override_dir {
            return override_dir.join("config");
        }

        if let Some(project_dirs) = &self.project_dirs {
            project_dirs.config_dir().to_path_buf()
        } else {
            // Fallback to current directory
            PathBuf::from("./config")
        }
    }

    /// Get the data directory for persistent storage
    pub fn data_dir(&self) -> PathBuf {
        if let Some(override_dir) = &self.override_dir {
            return override_dir.join("data");
        }

        if let Some(project_dirs) = &self.project_dirs {
            project_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from("./data")
        }
    }

    /// Default location of the persisted session
    pub fn session_path(&self) -> PathBuf {
        self.data_dir().join("session.json")
    }

    /// Location of the CLI log file
    pub fn log_path(&self) -> PathBuf {
        self.data_dir().join("cli.log")
    }

    /// Get the config path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join("paydash.toml")
    }
}

impl Default for StateDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn override_dir_layout() {
        let temp_dir = TempDir::new().unwrap();
        let state_dir = StateDir::with_override(temp_dir.path());

        assert_eq!(state_dir.config_dir(), temp_dir.path().join("config"));
        assert_eq!(
            state_dir.session_path(),
            temp_dir.path().join("data").join("session.json")
        );
        assert_eq!(
            state_dir.config_path(),
            temp_dir.path().join("config").join("paydash.toml")
        );
    }

    #[test]
    fn explicit_dir_wins() {
        let temp_dir = TempDir::new().unwrap();
        let state_dir = StateDir::resolve(Some(temp_dir.path().to_path_buf()));
        assert_eq!(state_dir.data_dir(), temp_dir.path().join("data"));
    }
}
