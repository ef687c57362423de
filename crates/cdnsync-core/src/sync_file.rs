use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pattern::RawPattern;
use crate::{slugify, ConfigError};

const DEFAULT_PURGE_BASE_URL: &str = "https://rws.maxcdn.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnDefinition {
    pub name: String,
    /// Overrides the slug derived from `name`.
    pub slug: Option<String>,
    /// Key of this CDN's entry in the sync payload. Defaults to the slug.
    pub source_key: Option<String>,
    pub url: Option<String>,
}

impl CdnDefinition {
    #[must_use]
    pub fn slug(&self) -> String {
        self.slug
            .as_deref()
            .map_or_else(|| slugify(&self.name), slugify)
    }
}

/// Location of the pull zone whose cache gets purged after a sync.
///
/// Credentials are not part of the file; they come from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeSettings {
    #[serde(default = "default_purge_base_url")]
    pub base_url: String,
    pub alias: String,
    pub zone_id: String,
}

fn default_purge_base_url() -> String {
    DEFAULT_PURGE_BASE_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncFile {
    pub sync_url: String,
    pub cdns: Vec<CdnDefinition>,
    /// Task name to recurrence pattern. Ordered so startup logs are stable.
    #[serde(default)]
    pub tasks: BTreeMap<String, RawPattern>,
    pub purge: PurgeSettings,
}

/// Load and validate the sync file.
///
/// Minute patterns are deliberately left unvalidated here; the scheduler
/// checks each one on its own so a single bad entry only disables that task.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sync_file(path: &Path) -> Result<SyncFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SyncFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sync_file(&content)
}

/// Parse and validate sync file contents.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_sync_file(content: &str) -> Result<SyncFile, ConfigError> {
    let sync_file: SyncFile = serde_yaml::from_str(content).map_err(ConfigError::SyncFileParse)?;
    validate_sync_file(&sync_file)?;
    Ok(sync_file)
}

fn validate_sync_file(sync_file: &SyncFile) -> Result<(), ConfigError> {
    if sync_file.sync_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sync_url must be non-empty".to_string(),
        ));
    }

    let mut seen_slugs = HashSet::new();
    for cdn in &sync_file.cdns {
        if cdn.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cdn name must be non-empty".to_string(),
            ));
        }

        let slug = cdn.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "cdn '{}' has no usable slug",
                cdn.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate cdn slug: '{}' (from cdn '{}')",
                slug, cdn.name
            )));
        }
    }

    if let Some(name) = sync_file.tasks.keys().find(|n| n.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "task name must be non-empty (got '{name}')"
        )));
    }

    if sync_file.purge.alias.trim().is_empty() || sync_file.purge.zone_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "purge.alias and purge.zone_id must be non-empty".to_string(),
        ));
    }

    Ok(())
}
