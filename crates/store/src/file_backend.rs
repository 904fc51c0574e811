//! File-based store: one JSON snapshot of progress and chat history.
//!
//! Records are loaded into memory on creation. Every mutation is applied to
//! a copy of the records, written to a temporary file that replaces the
//! snapshot, and only then made visible to readers.
//!
//! Storage location: `<data_dir>/store.json`

use async_trait::async_trait;
use pathcoach_core::error::StoreError;
use pathcoach_core::progress::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::in_memory::StoreState;

/// A file-backed store holding a JSON snapshot.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    state: Arc<RwLock<StoreState>>,
}

/// `store.json` becomes `store.json.<suffix>`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("store.json"));
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

impl FileStore {
    /// Open the snapshot at `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = Self::load_from_disk(&path);
        debug!(
            path = %path.display(),
            progresses = state.progresses.len(),
            chats = state.chats.len(),
            "File store loaded"
        );
        Self {
            path,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Open `store.json` inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::open(data_dir.join("store.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable snapshot is moved before starting empty.
    pub fn quarantine_path(&self) -> PathBuf {
        sibling(&self.path, "corrupt")
    }

    fn load_from_disk(path: &Path) -> StoreState {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoreState::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Store file is unreadable, starting empty");
                return StoreState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                let aside = sibling(path, "corrupt");
                match std::fs::rename(path, &aside) {
                    Ok(()) => warn!(
                        path = %path.display(),
                        moved_to = %aside.display(),
                        error = %e,
                        "Store file is corrupted, moved aside and starting empty"
                    ),
                    Err(io) => warn!(
                        path = %path.display(),
                        error = %e,
                        rename_error = %io,
                        "Store file is corrupted and could not be moved aside, starting empty"
                    ),
                }
                StoreState::default()
            }
        }
    }

    /// Write the snapshot to `store.json.tmp`, then rename it over `store.json`.
    async fn flush(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Storage(format!("Failed to create data directory: {e}")))?;
        }

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize store: {e}")))?;

        let tmp = sibling(&self.path, "tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write store file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to replace store file: {e}")))
    }

    /// Apply `mutate` to a copy of the records and publish it once the
    /// snapshot is on disk. The closure's flag says whether anything changed.
    async fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut StoreState) -> (T, bool),
    ) -> Result<T, StoreError> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let (out, changed) = mutate(&mut next);
        if changed {
            self.flush(&next).await?;
            *state = next;
        }
        Ok(out)
    }
}

#[async_trait]
impl ProgressStore for FileStore {
    async fn get(&self, user_id: &str, pathway_id: &str) -> Result<Option<Progress>, StoreError> {
        Ok(self.state.read().await.find(user_id, pathway_id).cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Progress>, StoreError> {
        Ok(self.state.read().await.by_user(user_id))
    }

    async fn start(&self, user_id: &str, pathway_id: &str) -> Result<RecordId, StoreError> {
        self.commit(|state| state.start(user_id, pathway_id)).await
    }

    async fn upsert_response(&self, upsert: UpsertProgress) -> Result<RecordId, StoreError> {
        self.commit(|state| (state.upsert(&upsert), true)).await
    }
}

#[async_trait]
impl ChatLog for FileStore {
    async fn append(&self, entry: NewChatEntry) -> Result<RecordId, StoreError> {
        self.commit(|state| (state.append_chat(entry), true)).await
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChatEntry>, StoreError> {
        Ok(self.state.read().await.chats_by_user(user_id, limit))
    }
}
