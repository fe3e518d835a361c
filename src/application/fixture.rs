//! Read-only post collection loaded from a local JSON file.
//!
//! Used when the key-value credential is absent so that local development
//! and static builds still have content to render.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;

use crate::domain::posts::{Post, format_timestamp};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("fixture `{path}` is not a JSON array of posts")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FixtureEntry {
    id: Option<String>,
    slug: Option<String>,
    title: Option<String>,
    excerpt: Option<String>,
    content: Option<String>,
    category: Option<String>,
    image: Option<String>,
    meta_description: Option<String>,
    published: Option<bool>,
    featured: Option<bool>,
    date: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl FixtureEntry {
    fn normalize(self, index: usize, stamp: &str) -> Option<Post> {
        let slug = present(self.slug.map(|s| s.trim().to_string()))?;
        Some(Post {
            id: present(self.id).unwrap_or_else(|| format!("local-{index}")),
            title: present(self.title).unwrap_or_else(|| slug.clone()),
            slug,
            excerpt: self.excerpt.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            meta_description: self.meta_description.unwrap_or_default(),
            published: self.published.unwrap_or(true),
            featured: self.featured.unwrap_or(false),
            date: present(self.date).unwrap_or_else(|| stamp.to_string()),
            created_at: present(self.created_at).unwrap_or_else(|| stamp.to_string()),
            updated_at: self.updated_at,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    posts: Vec<Post>,
}

impl FixtureSource {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let raw = std::fs::read(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw, OffsetDateTime::now_utc()).map_err(|source| FixtureError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a JSON array, filling defaults for missing fields. Entries
    /// without a slug are skipped.
    pub fn from_json(raw: &[u8], now: OffsetDateTime) -> Result<Self, serde_json::Error> {
        let entries: Vec<FixtureEntry> = serde_json::from_slice(raw)?;
        let stamp = format_timestamp(now);
        let mut posts = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match entry.normalize(index, &stamp) {
                Some(post) => posts.push(post),
                None => warn!(
                    target = "medee::application::fixture",
                    index,
                    "fixture entry has no slug; skipping"
                ),
            }
        }
        Ok(Self { posts })
    }

    pub fn from_posts(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn find(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.slug == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn missing_fields_receive_defaults() {
        let raw = br#"[{"slug":"a","title":""},{"slug":"b","title":"B","published":false,"id":"x"}]"#;
        let fixture = FixtureSource::from_json(raw, datetime!(2024-05-01 00:00 UTC)).unwrap();
        let posts = fixture.posts();

        assert_eq!(posts[0].id, "local-0");
        assert_eq!(posts[0].title, "a");
        assert!(posts[0].published);
        assert!(!posts[0].featured);
        assert_eq!(posts[0].date, "2024-05-01T00:00:00Z");
        assert_eq!(posts[0].created_at, "2024-05-01T00:00:00Z");

        assert_eq!(posts[1].id, "x");
        assert!(!posts[1].published);
    }

    #[test]
    fn entries_without_slug_are_skipped() {
        let raw = br#"[{"title":"orphan"},{"slug":"kept"}]"#;
        let fixture = FixtureSource::from_json(raw, datetime!(2024-05-01 00:00 UTC)).unwrap();
        assert_eq!(fixture.posts().len(), 1);
        assert_eq!(fixture.posts()[0].id, "local-1");
        assert!(fixture.find("kept").is_some());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = FixtureSource::load(Path::new("/nonexistent/posts.json")).unwrap_err();
        assert!(matches!(err, FixtureError::Read { .. }));
    }
}
