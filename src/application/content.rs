//! Logical post operations over the key-value store.

use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, stream};
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::application::fixture::FixtureSource;
use crate::application::stores::{KvStore, StoreError};
use crate::domain::error::DomainError;
use crate::domain::keys::KeyScheme;
use crate::domain::posts::{Post, PostDraft, PostPatch};
use crate::domain::slug::validate_slug;

pub const DEFAULT_FETCH_CONCURRENCY: usize = 16;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("post `{slug}` not found")]
    NotFound { slug: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("value stored under `{key}` is not a post")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("content store is not configured: {reason}")]
    ConfigurationMissing { reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode post")]
    Encode(#[source] serde_json::Error),
}

impl ContentError {
    pub fn not_found(slug: impl Into<String>) -> Self {
        Self::NotFound { slug: slug.into() }
    }

    pub fn configuration_missing(reason: impl Into<String>) -> Self {
        Self::ConfigurationMissing {
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContentError::NotFound { .. } | ContentError::Domain(DomainError::NotFound { .. })
        )
    }
}

#[derive(Clone)]
enum Backend {
    Remote(Arc<dyn KvStore>),
    Fixture(Arc<FixtureSource>),
    Unconfigured(String),
}

/// Post repository keyed by slug.
///
/// Writes go to the remote key-value store only. A fixture-backed store
/// serves reads and rejects writes with [`ContentError::ConfigurationMissing`].
#[derive(Clone)]
pub struct ContentStore {
    backend: Backend,
    keys: KeyScheme,
    fetch_concurrency: usize,
}

impl ContentStore {
    pub fn remote(kv: Arc<dyn KvStore>, keys: KeyScheme) -> Self {
        Self::with_backend(Backend::Remote(kv), keys)
    }

    pub fn fixture(source: FixtureSource, keys: KeyScheme) -> Self {
        Self::with_backend(Backend::Fixture(Arc::new(source)), keys)
    }

    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self::with_backend(Backend::Unconfigured(reason.into()), KeyScheme::default())
    }

    fn with_backend(backend: Backend, keys: KeyScheme) -> Self {
        Self {
            backend,
            keys,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency.max(1);
        self
    }

    pub fn keys(&self) -> &KeyScheme {
        &self.keys
    }

    pub fn source_label(&self) -> &'static str {
        match self.backend {
            Backend::Remote(_) => "remote",
            Backend::Fixture(_) => "fixture",
            Backend::Unconfigured(_) => "unconfigured",
        }
    }

    pub(crate) fn writer(&self) -> Result<&Arc<dyn KvStore>, ContentError> {
        match &self.backend {
            Backend::Remote(kv) => Ok(kv),
            Backend::Fixture(_) => Err(ContentError::configuration_missing(
                "key-value credentials are not configured; the local fixture is read-only",
            )),
            Backend::Unconfigured(reason) => Err(ContentError::configuration_missing(reason)),
        }
    }

    /// Slugs of every stored post under the canonical prefix.
    pub async fn list_posts(&self) -> Result<Vec<String>, ContentError> {
        match &self.backend {
            Backend::Remote(kv) => {
                let keys = kv.list_keys(Some(self.keys.prefix())).await?;
                Ok(keys
                    .iter()
                    .filter_map(|key| self.keys.slug_from_key(key))
                    .map(str::to_string)
                    .collect())
            }
            Backend::Fixture(fixture) => Ok(fixture
                .posts()
                .iter()
                .map(|post| post.slug.clone())
                .collect()),
            Backend::Unconfigured(reason) => Err(ContentError::configuration_missing(reason)),
        }
    }

    pub async fn get_post(&self, slug: &str) -> Result<Post, ContentError> {
        match &self.backend {
            Backend::Remote(kv) => self
                .find_stored(kv.as_ref(), slug)
                .await?
                .map(|(_, post)| post)
                .ok_or_else(|| ContentError::not_found(slug)),
            Backend::Fixture(fixture) => fixture
                .find(slug)
                .cloned()
                .ok_or_else(|| ContentError::not_found(slug)),
            Backend::Unconfigured(reason) => Err(ContentError::configuration_missing(reason)),
        }
    }

    /// Store a new post under its canonical key. An existing post with the
    /// same slug is overwritten.
    pub async fn create_post(&self, draft: PostDraft) -> Result<Post, ContentError> {
        let kv = self.writer()?;
        let draft = draft.normalize()?;
        self.keys.validate_slug(&draft.slug)?;
        let post = Post::create(draft, OffsetDateTime::now_utc());
        let key = self.keys.canonical(&post.slug);
        write_post(kv.as_ref(), &key, &post).await?;
        info!(
            target = "medee::application::content",
            slug = %post.slug,
            id = %post.id,
            "post created"
        );
        Ok(post)
    }

    /// Merge `patch` into the stored post. A slug change moves the post:
    /// the new key is written first, then the old keys are removed.
    pub async fn update_post(&self, slug: &str, patch: PostPatch) -> Result<Post, ContentError> {
        let kv = self.writer()?;
        let (found_key, post) = self
            .find_stored(kv.as_ref(), slug)
            .await?
            .ok_or_else(|| ContentError::not_found(slug))?;
        self.apply_update(kv.as_ref(), slug, &found_key, post, patch)
            .await
    }

    /// Update when present, otherwise create the post at `slug`.
    pub async fn upsert_post(&self, slug: &str, patch: PostPatch) -> Result<Post, ContentError> {
        let kv = self.writer()?;
        validate_slug(slug)?;
        self.keys.validate_slug(slug)?;
        match self.find_stored(kv.as_ref(), slug).await? {
            Some((found_key, post)) => {
                self.apply_update(kv.as_ref(), slug, &found_key, post, patch)
                    .await
            }
            None => {
                if let Some(body_slug) = patch.renamed_slug(slug) {
                    return Err(DomainError::validation(format!(
                        "body slug `{body_slug}` does not match path slug `{slug}`"
                    ))
                    .into());
                }
                self.create_post(patch.into_draft(slug)).await
            }
        }
    }

    /// Remove every key shape the post could live under. Absent keys are
    /// not an error.
    pub async fn delete_post(&self, slug: &str) -> Result<(), ContentError> {
        let kv = self.writer()?;
        for key in self.keys.read_candidates(slug) {
            kv.delete(&key).await?;
        }
        info!(
            target = "medee::application::content",
            slug = %slug,
            "post deleted"
        );
        Ok(())
    }

    /// Every post under the canonical prefix, in listing order. Values that
    /// fail to load or parse are logged and dropped.
    pub async fn get_all_posts(&self) -> Result<Vec<Post>, ContentError> {
        let kv = match &self.backend {
            Backend::Remote(kv) => kv.clone(),
            Backend::Fixture(fixture) => return Ok(fixture.posts().to_vec()),
            Backend::Unconfigured(reason) => {
                return Err(ContentError::configuration_missing(reason));
            }
        };

        let keys = kv.list_keys(Some(self.keys.prefix())).await?;
        let total = keys.len();

        let results: Vec<(String, Result<Option<Post>, ContentError>)> = stream::iter(keys)
            .map(|key| {
                let kv = kv.clone();
                async move {
                    let result = fetch_post(kv.as_ref(), &key).await;
                    (key, result)
                }
            })
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let mut posts = Vec::with_capacity(results.len());
        for (key, result) in results {
            match result {
                Ok(Some(post)) => posts.push(post),
                Ok(None) => {
                    debug!(
                        target = "medee::application::content",
                        key = %key,
                        "key disappeared between list and fetch"
                    );
                }
                Err(err) => {
                    counter!("medee_posts_dropped_total").increment(1);
                    warn!(
                        target = "medee::application::content",
                        key = %key,
                        error = %err,
                        "dropping post that failed to load"
                    );
                }
            }
        }

        debug!(
            target = "medee::application::content",
            listed = total,
            loaded = posts.len(),
            "aggregate read finished"
        );
        Ok(posts)
    }

    async fn apply_update(
        &self,
        kv: &dyn KvStore,
        slug: &str,
        found_key: &str,
        mut post: Post,
        patch: PostPatch,
    ) -> Result<Post, ContentError> {
        let rename = patch.renamed_slug(slug).map(str::to_string);
        if let Some(new_slug) = rename.as_deref() {
            self.keys.validate_slug(new_slug.trim())?;
        }
        post.apply_patch(patch, OffsetDateTime::now_utc())?;

        match rename {
            Some(new_slug) => {
                let new_key = self.keys.canonical(&new_slug);
                write_post(kv, &new_key, &post).await?;
                let old_keys = self
                    .keys
                    .read_candidates(slug)
                    .into_iter()
                    .filter(|old_key| *old_key != new_key);
                for old_key in old_keys {
                    if let Err(err) = kv.delete(&old_key).await {
                        warn!(
                            target = "medee::application::content",
                            from = %old_key,
                            to = %new_key,
                            error = %err,
                            "rename wrote the new key but could not remove the old one"
                        );
                        return Err(err.into());
                    }
                }
                info!(
                    target = "medee::application::content",
                    from = %slug,
                    to = %new_slug,
                    "post renamed"
                );
            }
            None => {
                post.slug = slug.to_string();
                let key = self.keys.canonical(slug);
                write_post(kv, &key, &post).await?;
                if found_key != key {
                    if let Err(err) = kv.delete(found_key).await {
                        warn!(
                            target = "medee::application::content",
                            key = %found_key,
                            error = %err,
                            "legacy key left behind after update"
                        );
                    }
                }
            }
        }

        Ok(post)
    }

    /// Probe the canonical key, then the legacy one.
    async fn find_stored(
        &self,
        kv: &dyn KvStore,
        slug: &str,
    ) -> Result<Option<(String, Post)>, ContentError> {
        for key in self.keys.read_candidates(slug) {
            if let Some(post) = fetch_post(kv, &key).await? {
                return Ok(Some((key, post)));
            }
        }
        Ok(None)
    }
}

pub(crate) async fn fetch_post(kv: &dyn KvStore, key: &str) -> Result<Option<Post>, ContentError> {
    let Some(raw) = kv.get(key).await? else {
        return Ok(None);
    };
    parse_post(key, &raw).map(Some)
}

pub(crate) fn parse_post(key: &str, raw: &[u8]) -> Result<Post, ContentError> {
    serde_json::from_slice(raw).map_err(|source| ContentError::Corrupt {
        key: key.to_string(),
        source,
    })
}

pub(crate) async fn write_post(kv: &dyn KvStore, key: &str, post: &Post) -> Result<(), ContentError> {
    let body = serde_json::to_vec(post).map_err(ContentError::Encode)?;
    kv.put(key, Bytes::from(body)).await?;
    Ok(())
}
