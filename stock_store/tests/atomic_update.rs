mod common;

use std::sync::Arc;

use common::{FlakyStore, Op};
use shared_utils::event_log::{LogLevel, MemoryLog};
use stock_store::{
    atomic::{AtomicStore, AtomicUpdateError, is_temp_key},
    blob::{BlobStore, FsStore, MemoryStore},
};

const KEY: &str = "prod/stock/raw/NVDA/latest.json";

fn temp_keys(keys: &[String]) -> Vec<&String> {
    keys.iter().filter(|k| is_temp_key(k)).collect()
}

#[tokio::test]
async fn second_update_wins_and_leaves_no_temp_objects() {
    let memory = Arc::new(MemoryStore::new());
    let atomic = AtomicStore::new(memory.clone(), Arc::new(MemoryLog::new()));

    atomic.atomic_update(KEY, b"v1".to_vec(), "text/plain").await.unwrap();
    atomic.atomic_update(KEY, b"v2".to_vec(), "text/plain").await.unwrap();

    assert_eq!(memory.get(KEY).await.unwrap(), b"v2");
    assert_eq!(memory.keys(), vec![KEY]);
}

#[tokio::test]
async fn works_over_the_filesystem_backend() {
    let dir = tempfile::tempdir().unwrap();
    let fs = Arc::new(FsStore::for_bucket(dir.path(), "bucket").unwrap());
    let atomic = AtomicStore::new(fs.clone(), Arc::new(MemoryLog::new()));

    atomic
        .atomic_json_update(KEY, &serde_json::json!({"close": 101.25}))
        .await
        .unwrap();

    let stored: serde_json::Value = serde_json::from_slice(&fs.get(KEY).await.unwrap()).unwrap();
    assert_eq!(stored["close"], 101.25);
    assert_eq!(fs.list("").await.unwrap(), vec![KEY.to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_never_see_partial_values() {
    let memory = Arc::new(MemoryStore::new());
    let atomic = AtomicStore::new(memory.clone(), Arc::new(MemoryLog::new()));
    let v1 = vec![b'a'; 4096];
    let v2 = vec![b'b'; 8192];

    let writer = {
        let (v1, v2) = (v1.clone(), v2.clone());
        tokio::spawn(async move {
            for i in 0..200 {
                let payload = if i % 2 == 0 { v1.clone() } else { v2.clone() };
                atomic.atomic_update(KEY, payload, "text/plain").await.unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..3 {
        let memory = memory.clone();
        let (v1, v2) = (v1.clone(), v2.clone());
        readers.push(tokio::spawn(async move {
            for _ in 0..500 {
                match memory.get(KEY).await {
                    Ok(bytes) => assert!(bytes == v1 || bytes == v2, "partial read"),
                    Err(err) => assert!(err.is_not_found()),
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(memory.get(KEY).await.unwrap(), v2);
}

#[tokio::test]
async fn failed_temp_put_leaves_key_unchanged_and_no_temp() {
    let flaky = Arc::new(FlakyStore::new().fail(Op::Put, 1).with_partial_put());
    flaky.inner.put(KEY, b"old".to_vec(), "text/plain").await.unwrap();
    let log = Arc::new(MemoryLog::new());
    let atomic = AtomicStore::new(flaky.clone(), log.clone());

    let err = atomic
        .atomic_update(KEY, b"new payload".to_vec(), "text/plain")
        .await
        .unwrap_err();

    assert!(matches!(err, AtomicUpdateError::Put { .. }));
    assert_eq!(err.key(), KEY);
    assert_eq!(flaky.inner.get(KEY).await.unwrap(), b"old");
    assert!(temp_keys(&flaky.inner.keys()).is_empty());
    assert!(flaky.calls(Op::Copy).is_empty());
    assert!(log.contains(LogLevel::Error, "staging"));
}

#[tokio::test]
async fn failed_copy_cleans_up_temp_and_reports_copy_failure() {
    let flaky = Arc::new(FlakyStore::new().fail(Op::Copy, 1));
    let log = Arc::new(MemoryLog::new());
    let atomic = AtomicStore::new(flaky.clone(), log.clone());

    let err = atomic
        .atomic_update(KEY, b"payload".to_vec(), "application/json")
        .await
        .unwrap_err();

    let AtomicUpdateError::Copy { temp_key, .. } = &err else {
        panic!("expected copy failure, got {err:?}");
    };
    assert!(temp_key.starts_with(KEY) && is_temp_key(temp_key));
    assert_eq!(flaky.calls(Op::Delete), vec![temp_key.clone()]);
    assert!(!flaky.inner.head(KEY).await.unwrap());
    assert!(flaky.inner.is_empty());
    assert!(log.contains(LogLevel::Error, "publishing"));
}

#[tokio::test]
async fn failed_temp_delete_is_only_a_warning() {
    let flaky = Arc::new(FlakyStore::new().fail(Op::Delete, 1));
    let log = Arc::new(MemoryLog::new());
    let atomic = AtomicStore::new(flaky.clone(), log.clone());

    atomic.atomic_update(KEY, b"v".to_vec(), "text/plain").await.unwrap();

    assert_eq!(flaky.inner.get(KEY).await.unwrap(), b"v");
    // the stray temp object is left behind
    assert_eq!(temp_keys(&flaky.inner.keys()).len(), 1);
    assert!(log.contains(LogLevel::Warn, "could not remove"));
}

#[tokio::test]
async fn cleanup_failure_does_not_mask_original_error() {
    let flaky = Arc::new(FlakyStore::new().fail(Op::Copy, 1).fail(Op::Head, 1));
    let log = Arc::new(MemoryLog::new());
    let atomic = AtomicStore::new(flaky.clone(), log.clone());

    let err = atomic
        .atomic_update(KEY, b"v".to_vec(), "text/plain")
        .await
        .unwrap_err();

    assert!(matches!(err, AtomicUpdateError::Copy { .. }));
    assert!(log.contains(LogLevel::Warn, "failed to check temporary object"));
}
