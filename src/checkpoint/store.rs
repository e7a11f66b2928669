//! Persisted key/value checkpoint store

use super::CollectionKey;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Checkpoint persistence errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Reading or writing the checkpoint file failed
    #[error("checkpoint file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The checkpoint file is not a JSON string map
    #[error("checkpoint file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Shared mapping from collection key to last processed close timestamp
///
/// Cloning is cheap and every clone sees the same entries. Each `set`
/// rewrites the backing file (if any) while holding the write lock, so
/// concurrent writers to different keys never persist a stale snapshot.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: Option<PathBuf>,
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl CheckpointStore {
    /// Create a store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Load the store from a JSON file
    ///
    /// A missing file is treated as a first run and yields an empty store
    /// bound to `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| CheckpointError::Json {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No checkpoint file yet, starting empty");
                HashMap::new()
            }
            Err(source) => return Err(CheckpointError::Io { path, source }),
        };

        tracing::info!(
            path = %path.display(),
            entries = entries.len(),
            "Loaded checkpoints"
        );

        Ok(Self {
            path: Some(path),
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Raw stored value for a key
    pub async fn get(&self, key: &CollectionKey) -> Option<String> {
        self.entries.read().await.get(key.as_str()).cloned()
    }

    /// Whether a value is stored for a key
    pub async fn contains(&self, key: &CollectionKey) -> bool {
        self.entries.read().await.contains_key(key.as_str())
    }

    /// Store a value and persist the whole map
    pub async fn set(
        &self,
        key: &CollectionKey,
        value: impl Into<String>,
    ) -> Result<(), CheckpointError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.as_str().to_string(), value.into());

        if let Some(ref path) = self.path {
            Self::persist(path, &entries).await?;
        }
        Ok(())
    }

    /// Sorted copy of every entry
    pub async fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Backing file, if the store is persisted
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write to a sibling temp file, then rename over the target
    async fn persist(
        path: &Path,
        entries: &HashMap<String, String>,
    ) -> Result<(), CheckpointError> {
        let sorted: BTreeMap<&String, &String> = entries.iter().collect();
        let json = serde_json::to_vec_pretty(&sorted).map_err(|source| CheckpointError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|source| CheckpointError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| CheckpointError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::trace!(path = %path.display(), entries = entries.len(), "Persisted checkpoints");
        Ok(())
    }
}
