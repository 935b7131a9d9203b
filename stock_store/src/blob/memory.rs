use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;

use super::{BlobStore, ListPage};
use crate::error::{NotFoundSnafu, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory [`BlobStore`]. Every operation holds the map lock for its whole
/// duration, so `copy` is trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every key, ascending.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content type recorded for `key`.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|obj| obj.content_type.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        match objects.get(key) {
            Some(obj) => Ok(obj.bytes.clone()),
            None => NotFoundSnafu { key }.fail(),
        }
    }

    async fn head(&self, key: &str) -> Result<bool> {
        Ok(self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key))
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        let Some(obj) = objects.get(src).cloned() else {
            return NotFoundSnafu { key: src }.fail();
        };
        objects.insert(dst.to_string(), obj);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let lower = match continuation {
            Some(after) => Bound::Excluded(after.to_string()),
            None => Bound::Included(prefix.to_string()),
        };

        let mut matching = objects
            .range::<String, _>((lower, Bound::Unbounded))
            .map(|(key, _)| key)
            .skip_while(|key| key.as_str() < prefix)
            .take_while(|key| key.starts_with(prefix));

        let keys: Vec<String> = matching.by_ref().take(max_keys.max(1)).cloned().collect();
        let next_continuation = match matching.next() {
            Some(_) => keys.last().cloned(),
            None => None,
        };
        Ok(ListPage {
            keys,
            next_continuation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::JSON_CONTENT_TYPE;

    #[tokio::test]
    async fn put_get_head_delete() {
        let store = MemoryStore::new();
        store.put("a/b.json", b"{}".to_vec(), JSON_CONTENT_TYPE).await.unwrap();

        assert!(store.head("a/b.json").await.unwrap());
        assert_eq!(store.get("a/b.json").await.unwrap(), b"{}");
        assert_eq!(store.content_type("a/b.json").as_deref(), Some(JSON_CONTENT_TYPE));

        store.delete("a/b.json").await.unwrap();
        assert!(!store.head("a/b.json").await.unwrap());
        assert!(store.get("a/b.json").await.unwrap_err().is_not_found());
        // deleting twice is fine
        store.delete("a/b.json").await.unwrap();
    }

    #[tokio::test]
    async fn copy_replaces_destination_and_keeps_source() {
        let store = MemoryStore::new();
        store.put("src", b"new".to_vec(), "text/plain").await.unwrap();
        store.put("dst", b"old".to_vec(), "text/plain").await.unwrap();

        store.copy("src", "dst").await.unwrap();
        assert_eq!(store.get("dst").await.unwrap(), b"new");
        assert_eq!(store.get("src").await.unwrap(), b"new");

        assert!(store.copy("missing", "dst").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn listing_pages_through_prefix_only() {
        let store = MemoryStore::new();
        for key in ["a/1", "a/2", "a/3", "ab/1", "b/1", "0"] {
            store.put(key, Vec::new(), "text/plain").await.unwrap();
        }

        let first = store.list_page("a/", None, 2).await.unwrap();
        assert_eq!(first.keys, vec!["a/1", "a/2"]);
        assert_eq!(first.next_continuation.as_deref(), Some("a/2"));

        let second = store
            .list_page("a/", first.next_continuation.as_deref(), 2)
            .await
            .unwrap();
        assert_eq!(second.keys, vec!["a/3"]);
        assert_eq!(second.next_continuation, None);

        assert_eq!(store.list("a").await.unwrap(), vec!["a/1", "a/2", "a/3", "ab/1"]);
        assert_eq!(store.list("").await.unwrap().len(), 6);
        assert!(store.list("zzz").await.unwrap().is_empty());
    }
}
