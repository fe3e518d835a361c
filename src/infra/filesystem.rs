//! Filesystem-backed object store for local development.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tokio::{fs, io::AsyncWriteExt};

use crate::application::stores::{ObjectInfo, ObjectStore, StoreError};
use crate::infra::telemetry::record_store_request;

const STORE: &str = "filesystem";

#[derive(Debug)]
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Read a stored object into memory.
    pub async fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        let absolute = self.resolve(key)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Map a key to a path under the root, rejecting anything that escapes it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }

    async fn put_inner(&self, key: &str, body: Bytes) -> Result<(), StoreError> {
        let absolute = self.resolve(key)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&body).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;
        Ok(())
    }

    async fn list_inner(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let mut objects = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(key) = self.key_for(&path) else {
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }
                objects.push(ObjectInfo {
                    key,
                    size: metadata.len(),
                    uploaded: metadata.modified().ok().map(OffsetDateTime::from),
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect();
        Some(parts?.join("/"))
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<(), StoreError> {
        let result = self.put_inner(key, body).await;
        record_store_request(STORE, "put", result.is_ok());
        result
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let result = self.list_inner(prefix).await;
        record_store_request(STORE, "list", result.is_ok());
        result
    }
}
