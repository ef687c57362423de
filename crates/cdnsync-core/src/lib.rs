pub mod app_config;
pub mod config;
pub mod pattern;
pub mod schemas;
pub mod sync_file;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use pattern::{MinutePattern, PatternError, RawPattern};
pub use schemas::{CdnSchema, SchemaRegistry};
pub use sync_file::{load_sync_file, CdnDefinition, PurgeSettings, SyncFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sync file {path}: {source}")]
    SyncFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sync file: {0}")]
    SyncFileParse(#[source] serde_yaml::Error),

    #[error("sync file validation failed: {0}")]
    Validation(String),
}

/// Generate a URL-safe slug from a display name.
///
/// Lowercases ASCII, turns spaces into dashes, drops everything else that is
/// not alphanumeric or a dash, and collapses repeated dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                Some(c)
            } else if c == ' ' || c == '_' || c == '.' {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
