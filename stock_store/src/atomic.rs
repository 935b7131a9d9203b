//! Single-object atomic replacement over a [`BlobStore`].
//!
//! An update is staged under a unique temporary key and then published with a
//! server-side copy onto the target key:
//!
//! 1. `put` the payload to `{key}.tmp.{uuid}`
//! 2. `copy` the temp object onto `key`
//! 3. `delete` the temp object
//!
//! A failure in step 1 or 2 removes the temp object (best effort) and returns
//! the original failure. A failure in step 3 only leaves a stray temp object
//! behind, so it is logged and the update still counts as done.
//!
//! Readers of `key` observe either the previous object or the new one, never
//! a partial write, provided the store's `copy` replaces the destination
//! atomically (true for object stores and for [`FsStore`](crate::blob::FsStore)).
//! There is no retry here and no compare-and-swap: concurrent writers to the
//! same key resolve as last-writer-wins.

use std::sync::Arc;

use serde::Serialize;
use shared_utils::event_log::EventLog;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    blob::{BlobStore, JSON_CONTENT_TYPE},
    error::StoreError,
};

/// Marker between the target key and the unique suffix of a temp key.
pub const TEMP_KEY_MARKER: &str = ".tmp.";

/// An atomic update that did not reach the target key.
#[derive(Debug, Error)]
pub enum AtomicUpdateError {
    /// Writing the temp object failed; `key` is unchanged.
    #[error("failed to stage {temp_key} for {key}: {source}")]
    Put {
        /// Target key.
        key: String,
        /// Temp key that was being written.
        temp_key: String,
        /// Store failure.
        source: StoreError,
    },

    /// Copying the temp object onto the target failed; `key` is unchanged.
    #[error("failed to publish {temp_key} to {key}: {source}")]
    Copy {
        /// Target key.
        key: String,
        /// Temp key holding the staged payload.
        temp_key: String,
        /// Store failure.
        source: StoreError,
    },

    /// The value could not be rendered as JSON; nothing was written.
    #[error("failed to serialize value for {key}: {source}")]
    Serialize {
        /// Target key.
        key: String,
        /// Encoder failure.
        source: serde_json::Error,
    },
}

impl AtomicUpdateError {
    /// The key the update was aimed at.
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Copy { key, .. } | Self::Serialize { key, .. } => key,
        }
    }
}

/// Temp key for an update of `key`: `{key}.tmp.{uuid-v4}`.
pub fn temp_key_for(key: &str) -> String {
    format!("{key}{TEMP_KEY_MARKER}{}", Uuid::new_v4())
}

/// True for keys produced by [`temp_key_for`].
pub fn is_temp_key(key: &str) -> bool {
    key.rsplit_once(TEMP_KEY_MARKER)
        .is_some_and(|(_, suffix)| Uuid::parse_str(suffix).is_ok())
}

/// Performs atomic single-object updates against a shared [`BlobStore`].
#[derive(Clone)]
pub struct AtomicStore {
    store: Arc<dyn BlobStore>,
    log: Arc<dyn EventLog>,
}

impl AtomicStore {
    /// Wrap `store`, reporting through `log`.
    pub fn new(store: Arc<dyn BlobStore>, log: Arc<dyn EventLog>) -> Self {
        Self { store, log }
    }

    /// The underlying store, for plain reads.
    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Replace the object under `key` with `payload`.
    pub async fn atomic_update(
        &self,
        key: &str,
        payload: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AtomicUpdateError> {
        let temp_key = temp_key_for(key);

        if let Err(source) = self.store.put(&temp_key, payload, content_type).await {
            self.log
                .error(&format!("atomic update of {key}: staging {temp_key} failed: {source}"));
            self.cleanup(&temp_key).await;
            return Err(AtomicUpdateError::Put {
                key: key.to_string(),
                temp_key,
                source,
            });
        }

        if let Err(source) = self.store.copy(&temp_key, key).await {
            self.log
                .error(&format!("atomic update of {key}: publishing {temp_key} failed: {source}"));
            self.cleanup(&temp_key).await;
            return Err(AtomicUpdateError::Copy {
                key: key.to_string(),
                temp_key,
                source,
            });
        }

        if let Err(err) = self.store.delete(&temp_key).await {
            self.log
                .warn(&format!("updated {key} but could not remove {temp_key}: {err}"));
        }

        self.log.info(&format!("atomically updated {key}"));
        Ok(())
    }

    /// Serialize `value` as JSON and [`atomic_update`](Self::atomic_update) it under `key`.
    pub async fn atomic_json_update<T>(&self, key: &str, value: &T) -> Result<(), AtomicUpdateError>
    where
        T: Serialize + ?Sized + Sync,
    {
        let payload =
            serde_json::to_vec_pretty(value).map_err(|source| AtomicUpdateError::Serialize {
                key: key.to_string(),
                source,
            })?;
        self.atomic_update(key, payload, JSON_CONTENT_TYPE).await
    }

    async fn cleanup(&self, temp_key: &str) {
        match self.store.head(temp_key).await {
            Ok(true) => {
                if let Err(err) = self.store.delete(temp_key).await {
                    self.log
                        .warn(&format!("failed to clean up temporary object {temp_key}: {err}"));
                }
            }
            Ok(false) => {}
            Err(err) => {
                self.log
                    .warn(&format!("failed to check temporary object {temp_key}: {err}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryStore;
    use shared_utils::event_log::{LogLevel, MemoryLog};

    #[test]
    fn temp_keys_are_unique_and_recognisable() {
        let a = temp_key_for("prod/stock/raw/NVDA/latest.json");
        let b = temp_key_for("prod/stock/raw/NVDA/latest.json");
        assert_ne!(a, b);
        assert!(a.starts_with("prod/stock/raw/NVDA/latest.json.tmp."));
        assert!(is_temp_key(&a));
        assert!(!is_temp_key("prod/stock/raw/NVDA/latest.json"));
        assert!(!is_temp_key("notes.tmp.txt"));
    }

    #[tokio::test]
    async fn json_update_writes_pretty_json_and_no_temp() {
        let memory = Arc::new(MemoryStore::new());
        let log = Arc::new(MemoryLog::new());
        let atomic = AtomicStore::new(memory.clone(), log.clone());

        atomic
            .atomic_json_update("k.json", &serde_json::json!({ "symbol": "NVDA" }))
            .await
            .unwrap();

        assert_eq!(memory.keys(), vec!["k.json"]);
        assert_eq!(memory.content_type("k.json").as_deref(), Some(JSON_CONTENT_TYPE));
        let stored: serde_json::Value =
            serde_json::from_slice(&memory.get("k.json").await.unwrap()).unwrap();
        assert_eq!(stored["symbol"], "NVDA");
        assert!(log.contains(LogLevel::Info, "atomically updated k.json"));
    }

    #[test]
    fn error_exposes_target_key() {
        let err = AtomicUpdateError::Serialize {
            key: "k.json".into(),
            source: serde_json::from_str::<u8>("x").unwrap_err(),
        };
        assert_eq!(err.key(), "k.json");
    }
}
