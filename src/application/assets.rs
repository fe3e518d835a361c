//! Image uploads into the object store.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;

use crate::application::stores::{ObjectStore, StoreError};
use crate::domain::assets::{DEFAULT_ASSET_PREFIX, asset_key, public_url, resolve_image_url};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid upload: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How object keys turn into links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetUrls {
    public_base: Option<String>,
    absolute: bool,
}

impl AssetUrls {
    pub fn new(public_base: Option<String>, absolute: bool) -> Self {
        let public_base = public_base
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty());
        Self {
            public_base,
            absolute,
        }
    }

    pub fn public_base(&self) -> Option<&str> {
        self.public_base.as_deref()
    }

    /// Absolute URL when configured for it, otherwise the root-relative path.
    pub fn link_for_key(&self, key: &str) -> String {
        match (&self.public_base, self.absolute) {
            (Some(base), true) => public_url(base, key),
            _ => format!("/{}", key.trim_start_matches('/')),
        }
    }

    /// Resolve a post's `image` field for rendering.
    pub fn resolve(&self, image: &str) -> String {
        resolve_image_url(self.public_base(), image)
    }
}

#[derive(Debug, Clone)]
pub struct AssetUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub key: String,
    pub path: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetListing {
    pub key: String,
    pub url: String,
    pub size: u64,
    pub uploaded: Option<String>,
}

#[derive(Clone)]
pub struct AssetService {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    urls: AssetUrls,
}

impl AssetService {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<String>, urls: AssetUrls) -> Self {
        let prefix = prefix
            .map(|value| value.trim_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ASSET_PREFIX.to_string());
        Self {
            store,
            prefix,
            urls,
        }
    }

    pub fn urls(&self) -> &AssetUrls {
        &self.urls
    }

    pub async fn upload_image(&self, upload: AssetUpload) -> Result<StoredAsset, AssetError> {
        if upload.data.is_empty() {
            return Err(AssetError::Validation("uploaded file is empty".to_string()));
        }
        let filename = upload.filename.trim();
        if filename.is_empty() {
            return Err(AssetError::Validation("uploaded file has no name".to_string()));
        }

        let content_type = content_type_for(upload.content_type.as_deref(), filename);
        let key = asset_key(&self.prefix, filename, OffsetDateTime::now_utc());
        let size = upload.data.len();

        self.store.put(&key, upload.data, &content_type).await?;

        info!(
            target = "medee::application::assets",
            key = %key,
            content_type = %content_type,
            size,
            "image uploaded"
        );

        Ok(StoredAsset {
            path: format!("/{key}"),
            url: self.urls.link_for_key(&key),
            key,
        })
    }

    pub async fn list_images(&self) -> Result<Vec<AssetListing>, AssetError> {
        let prefix = format!("{}/", self.prefix);
        let objects = self.store.list(&prefix).await?;
        Ok(objects
            .into_iter()
            .map(|object| AssetListing {
                url: self.urls.link_for_key(&object.key),
                uploaded: object
                    .uploaded
                    .and_then(|stamp| stamp.format(&Rfc3339).ok()),
                size: object.size,
                key: object.key,
            })
            .collect())
    }
}

/// Declared type, else a guess from the extension, else octet-stream.
pub fn content_type_for(declared: Option<&str>, filename: &str) -> String {
    declared
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != FALLBACK_CONTENT_TYPE)
        .map(str::to_string)
        .or_else(|| {
            mime_guess::from_path(filename)
                .first()
                .map(|mime| mime.essence_str().to_string())
        })
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_type_wins() {
        assert_eq!(content_type_for(Some("image/webp"), "a.png"), "image/webp");
    }

    #[test]
    fn guesses_from_extension() {
        assert_eq!(content_type_for(None, "a.png"), "image/png");
        assert_eq!(
            content_type_for(Some("application/octet-stream"), "a.jpg"),
            "image/jpeg"
        );
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(content_type_for(None, "blob"), FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn relative_links_without_absolute_flag() {
        let urls = AssetUrls::new(Some("https://cdn.example/".into()), false);
        assert_eq!(urls.link_for_key("images/a.png"), "/images/a.png");
        assert_eq!(urls.resolve("/images/a.png"), "https://cdn.example/images/a.png");
    }

    #[test]
    fn absolute_links_join_public_base() {
        let urls = AssetUrls::new(Some("https://cdn.example/".into()), true);
        assert_eq!(
            urls.link_for_key("images/a.png"),
            "https://cdn.example/images/a.png"
        );
    }
}
