use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use snafu::{IntoError, ResultExt, ensure};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use super::{BlobStore, ListPage};
use crate::error::{InvalidKeySnafu, IoSnafu, NotFoundSnafu, Result, StoreError};

/// Directory holding in-flight writes. Never listed, never addressable.
const STAGING_DIR: &str = ".staging";

/// [`BlobStore`] backed by a local directory.
///
/// Each key maps to a file below `root` (`/` separated segments become
/// directories). Writes and copies land in a staging file first and are
/// renamed into place, so readers never observe a half-written object.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store for `bucket` under `base`, i.e. `base/bucket`.
    pub fn for_bucket(base: impl AsRef<Path>, bucket: &str) -> Result<Self> {
        ensure!(
            is_plain_segment(bucket),
            InvalidKeySnafu {
                key: bucket,
                reason: "bucket must be a single non-empty path segment",
            }
        );
        Ok(Self::new(base.as_ref().join(bucket)))
    }

    /// Directory this store writes under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        ensure!(
            !key.is_empty(),
            InvalidKeySnafu {
                key,
                reason: "empty key",
            }
        );
        ensure!(
            !key.starts_with('/'),
            InvalidKeySnafu {
                key,
                reason: "keys are relative",
            }
        );

        let mut path = self.root.clone();
        for (idx, segment) in key.split('/').enumerate() {
            ensure!(
                is_plain_segment(segment),
                InvalidKeySnafu {
                    key,
                    reason: format!("segment {segment:?} is not allowed"),
                }
            );
            ensure!(
                !(idx == 0 && segment == STAGING_DIR),
                InvalidKeySnafu {
                    key,
                    reason: "the staging area is reserved",
                }
            );
            path.push(segment);
        }
        Ok(path)
    }

    async fn staging_path(&self, key: &str) -> Result<PathBuf> {
        let dir = self.root.join(STAGING_DIR);
        fs::create_dir_all(&dir).await.context(IoSnafu { key })?;
        Ok(dir.join(Uuid::new_v4().to_string()))
    }

    /// Move a fully written staging file to `dest`.
    async fn publish(&self, key: &str, staged: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.context(IoSnafu { key })?;
        }
        if let Err(err) = fs::rename(staged, dest).await {
            let _ = fs::remove_file(staged).await;
            return Err(err).context(IoSnafu { key });
        }
        Ok(())
    }

    /// Every key under the root, unsorted.
    async fn walk(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, rel)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err).context(IoSnafu { key: &rel }),
            };

            while let Some(entry) = entries.next_entry().await.context(IoSnafu { key: &rel })? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if rel.is_empty() && name == STAGING_DIR {
                    continue;
                }
                let child = if rel.is_empty() {
                    name
                } else {
                    format!("{rel}/{name}")
                };
                let file_type = entry.file_type().await.context(IoSnafu { key: &child })?;
                if file_type.is_dir() {
                    pending.push((entry.path(), child));
                } else if file_type.is_file() {
                    keys.push(child);
                }
            }
        }
        Ok(keys)
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

fn not_found_or_io(key: &str, err: std::io::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        NotFoundSnafu { key }.build()
    } else {
        IoSnafu { key }.into_error(err)
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        let dest = self.path_for(key)?;
        let staged = self.staging_path(key).await?;
        if let Err(err) = fs::write(&staged, &bytes).await {
            let _ = fs::remove_file(&staged).await;
            return Err(err).context(IoSnafu { key });
        }
        self.publish(key, &staged, &dest).await?;
        debug!(key, bytes = bytes.len(), "object written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).await.map_err(|err| not_found_or_io(key, err))
    }

    async fn head(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).context(IoSnafu { key }),
        }
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let src_path = self.path_for(src)?;
        let dst_path = self.path_for(dst)?;
        let staged = self.staging_path(dst).await?;
        if let Err(err) = fs::copy(&src_path, &staged).await {
            let _ = fs::remove_file(&staged).await;
            return Err(not_found_or_io(src, err));
        }
        self.publish(dst, &staged, &dst_path).await?;
        debug!(src, dst, "object copied");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context(IoSnafu { key }),
        }
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let mut keys: Vec<String> = self
            .walk()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| continuation.is_none_or(|after| key.as_str() > after))
            .collect();
        keys.sort();

        let limit = max_keys.max(1);
        let next_continuation = if keys.len() > limit {
            keys.truncate(limit);
            keys.last().cloned()
        } else {
            None
        };
        Ok(ListPage {
            keys,
            next_continuation,
        })
    }
}
