//! Whole-object key/value storage.
//!
//! [`BlobStore`] is the minimal surface an object store offers: whole-object
//! PUT/GET/HEAD/COPY/DELETE plus paginated prefix listing. Higher layers
//! ([`AtomicStore`](crate::atomic::AtomicStore),
//! [`MigrationRunner`](crate::migrate::MigrationRunner)) are written against
//! the trait only.
//!
//! Implementations:
//! - [`MemoryStore`]: in-process map, deterministic, used by mock runs and tests.
//! - [`FsStore`]: a directory per bucket on the local filesystem.

mod fs;
mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Page size used by [`BlobStore::list`].
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Content type used for every JSON object this workspace writes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Keys in ascending order.
    pub keys: Vec<String>,
    /// Token for the next page; `None` on the last page.
    pub next_continuation: Option<String>,
}

/// An object store addressed by string keys.
///
/// Every operation is whole-object. `copy` is expected to replace the
/// destination atomically: a concurrent `get` observes either the previous
/// object or the new one. [`AtomicStore`](crate::atomic::AtomicStore) relies
/// on that.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Read the object under `key`.
    ///
    /// Returns [`StoreError::NotFound`](crate::error::StoreError::NotFound) when absent.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Whether an object exists under `key`.
    async fn head(&self, key: &str) -> Result<bool>;

    /// Server-side copy of `src` to `dst`.
    async fn copy(&self, src: &str, dst: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Up to `max_keys` keys starting with `prefix`, resuming after `continuation`.
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage>;

    /// Every key starting with `prefix`, draining all pages.
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let page = self
                .list_page(prefix, continuation.as_deref(), DEFAULT_PAGE_SIZE)
                .await?;
            keys.extend(page.keys);
            match page.next_continuation {
                Some(token) => continuation = Some(token),
                None => return Ok(keys),
            }
        }
    }
}
