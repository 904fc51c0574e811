pub mod advance;
pub mod chat;
pub mod onboard;
pub mod pathways;
pub mod records;

use std::path::Path;

use anyhow::Context;
use pathcoach_config::AppConfig;
use pathcoach_core::pathway::PathwayCatalog;
use pathcoach_store::FileStore;

pub(crate) fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}

/// The store under the configured data directory.
pub(crate) fn open_store(config: &AppConfig) -> FileStore {
    FileStore::in_dir(&config.data_dir())
}

/// Read a catalog file as raw JSON. The loop parses it leniently.
pub(crate) fn read_catalog_json(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pathway catalog {}", path.display()))
}

/// Read and parse a catalog file, rejecting documents that do not parse.
pub(crate) fn load_catalog(path: &Path) -> anyhow::Result<PathwayCatalog> {
    let json = read_catalog_json(path)?;
    let document: serde_json::Value = serde_json::from_str(&json)
        .with_context(|| format!("{} is not a pathway catalog", path.display()))?;
    if !document.is_object() {
        anyhow::bail!("{} is not a pathway catalog", path.display());
    }
    Ok(PathwayCatalog::from_document(document))
}
