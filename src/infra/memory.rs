//! In-process store implementations for local runs and tests.
//!
//! Both stores record how often they were called and can be told to fail
//! specific operations, which lets callers exercise partial-failure paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;

use crate::application::stores::{KvStore, ObjectInfo, ObjectStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvOp {
    List,
    Get,
    Put,
    Delete,
}

#[derive(Debug, Default)]
struct Failures {
    ops: HashSet<KvOp>,
    keys: HashSet<(KvOp, String)>,
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, Bytes>>,
    failures: Mutex<Failures>,
    calls: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing failure injection.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        lock(&self.entries).insert(key.into(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<Bytes> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }

    /// Number of trait calls served so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every call of `op` fail.
    pub fn fail_op(&self, op: KvOp) {
        lock(&self.failures).ops.insert(op);
    }

    /// Make `op` fail for one key only.
    pub fn fail_key(&self, op: KvOp, key: impl Into<String>) {
        lock(&self.failures).keys.insert((op, key.into()));
    }

    fn check(&self, op: KvOp, key: Option<&str>) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failures = lock(&self.failures);
        let keyed = key.is_some_and(|key| failures.keys.contains(&(op, key.to_string())));
        if failures.ops.contains(&op) || keyed {
            return Err(StoreError::upstream(
                "memory",
                500,
                format!("injected {op:?} failure"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StoreError> {
        self.check(KvOp::List, None)?;
        Ok(lock(&self.entries)
            .keys()
            .filter(|key| prefix.is_none_or(|prefix| key.starts_with(prefix)))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.check(KvOp::Get, Some(key))?;
        Ok(lock(&self.entries).get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        self.check(KvOp::Put, Some(key))?;
        lock(&self.entries).insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check(KvOp::Delete, Some(key))?;
        lock(&self.entries).remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
    uploaded: OffsetDateTime,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    calls: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Body and content type of a stored object.
    pub fn object(&self, key: &str) -> Option<(Bytes, String)> {
        lock(&self.objects)
            .get(key)
            .map(|object| (object.body.clone(), object.content_type.clone()))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.objects).insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                uploaded: OffsetDateTime::now_utc(),
            },
        );
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.objects)
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.body.len() as u64,
                uploaded: Some(object.uploaded),
            })
            .collect())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
