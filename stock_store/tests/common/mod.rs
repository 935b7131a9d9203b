#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use stock_store::{
    blob::{BlobStore, ListPage, MemoryStore},
    error::{BackendSnafu, Result},
};

/// Which operation a [`FlakyStore`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Put,
    Copy,
    Delete,
    Head,
    List,
}

/// Wraps a [`MemoryStore`] and fails selected operations a set number of times.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: Arc<MemoryStore>,
    put_failures: AtomicUsize,
    copy_failures: AtomicUsize,
    delete_failures: AtomicUsize,
    head_failures: AtomicUsize,
    list_failures: AtomicUsize,
    /// Write a truncated object before reporting a put failure.
    partial_put: bool,
    calls: Mutex<Vec<(Op, String)>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(self, op: Op, times: usize) -> Self {
        self.counter(op).store(times, Ordering::SeqCst);
        self
    }

    pub fn with_partial_put(mut self) -> Self {
        self.partial_put = true;
        self
    }

    pub fn calls(&self, op: Op) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, key)| key.clone())
            .collect()
    }

    fn counter(&self, op: Op) -> &AtomicUsize {
        match op {
            Op::Put => &self.put_failures,
            Op::Copy => &self.copy_failures,
            Op::Delete => &self.delete_failures,
            Op::Head => &self.head_failures,
            Op::List => &self.list_failures,
        }
    }

    fn record(&self, op: Op, key: &str) {
        self.calls.lock().unwrap().push((op, key.to_string()));
    }

    fn should_fail(&self, op: Op) -> bool {
        self.counter(op)
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn injected<T>(op: Op, key: &str) -> Result<T> {
        BackendSnafu {
            message: format!("injected {op:?} failure for {key}"),
        }
        .fail()
    }
}

#[async_trait]
impl BlobStore for FlakyStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.record(Op::Put, key);
        if self.should_fail(Op::Put) {
            if self.partial_put {
                let half = bytes[..bytes.len() / 2].to_vec();
                self.inner.put(key, half, content_type).await?;
            }
            return Self::injected(Op::Put, key);
        }
        self.inner.put(key, bytes, content_type).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn head(&self, key: &str) -> Result<bool> {
        self.record(Op::Head, key);
        if self.should_fail(Op::Head) {
            return Self::injected(Op::Head, key);
        }
        self.inner.head(key).await
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        self.record(Op::Copy, dst);
        if self.should_fail(Op::Copy) {
            return Self::injected(Op::Copy, dst);
        }
        self.inner.copy(src, dst).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.record(Op::Delete, key);
        if self.should_fail(Op::Delete) {
            return Self::injected(Op::Delete, key);
        }
        self.inner.delete(key).await
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        self.record(Op::List, prefix);
        if self.should_fail(Op::List) {
            return Self::injected(Op::List, prefix);
        }
        self.inner.list_page(prefix, continuation, max_keys).await
    }
}

pub async fn seed(store: &MemoryStore, keys: &[&str]) {
    for key in keys {
        store
            .put(key, format!("{{\"key\":\"{key}\"}}").into_bytes(), "application/json")
            .await
            .unwrap();
    }
}
