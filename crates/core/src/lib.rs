//! Paydash core types and utilities

pub mod config;
pub mod error;
pub mod session;
pub mod state_dir;
pub mod validation;

pub use config::{ApiConfig, PaydashConfig, SessionConfig};
pub use error::{CoreError, CoreResult};
pub use session::{
    Credentials, FileSessionStore, MemorySessionStore, Role, Session, SessionStore,
};
pub use state_dir::StateDir;
pub use validation::{ValidateConfig, validators};
