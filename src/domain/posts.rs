//! The post entity, its creation input and partial-update patch.

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use super::error::DomainError;
use super::slug::{derive_slug, validate_slug};

/// A stored blog post. The serialized form is the exact JSON value kept in
/// the key-value namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Input for creating a post. `id` and timestamps are server-assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostDraft {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub image: String,
    pub meta_description: String,
    #[serde(default = "default_published")]
    pub published: bool,
    pub featured: bool,
    pub date: String,
}

/// Partial update. Absent fields keep their stored value; `id`, `createdAt`
/// and `updatedAt` in the request body are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostPatch {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub meta_description: Option<String>,
    pub published: Option<bool>,
    pub featured: Option<bool>,
    pub date: Option<String>,
}

fn default_published() -> bool {
    true
}

/// `post_<unix-millis>_<random>`.
pub fn generate_post_id(now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let random = Uuid::new_v4().simple().to_string();
    format!("post_{millis}_{}", &random[..8])
}

pub fn format_timestamp(now: OffsetDateTime) -> String {
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

impl PostDraft {
    /// Fill in a missing slug from the title and validate the result.
    pub fn normalize(mut self) -> Result<Self, DomainError> {
        if self.slug.trim().is_empty() {
            self.slug = derive_slug(&self.title)
                .map_err(|err| DomainError::validation(format!("slug: {err}")))?;
        }
        self.slug = self.slug.trim().to_string();
        validate_slug(&self.slug)?;
        Ok(self)
    }
}

impl Post {
    /// Build a new post from a normalized draft, assigning identity and
    /// timestamps.
    pub fn create(draft: PostDraft, now: OffsetDateTime) -> Self {
        let stamp = format_timestamp(now);
        let date = if draft.date.trim().is_empty() {
            stamp.clone()
        } else {
            draft.date
        };

        Self {
            id: generate_post_id(now),
            slug: draft.slug,
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            category: draft.category,
            image: draft.image,
            meta_description: draft.meta_description,
            published: draft.published,
            featured: draft.featured,
            date,
            created_at: stamp.clone(),
            updated_at: Some(stamp),
        }
    }

    /// Merge `patch` over this post. Identity fields survive untouched.
    pub fn apply_patch(&mut self, patch: PostPatch, now: OffsetDateTime) -> Result<(), DomainError> {
        if let Some(slug) = patch.slug {
            let slug = slug.trim().to_string();
            validate_slug(&slug)?;
            self.slug = slug;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(excerpt) = patch.excerpt {
            self.excerpt = excerpt;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(meta) = patch.meta_description {
            self.meta_description = meta;
        }
        if let Some(published) = patch.published {
            self.published = published;
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        self.updated_at = Some(format_timestamp(now));
        Ok(())
    }
}

impl PostPatch {
    /// The slug a patch renames to, if it differs from `current`.
    pub fn renamed_slug(&self, current: &str) -> Option<&str> {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty() && *slug != current)
    }

    /// Turn a patch into a draft for create-on-PUT.
    pub fn into_draft(self, slug: &str) -> PostDraft {
        PostDraft {
            slug: slug.to_string(),
            title: self.title.unwrap_or_default(),
            excerpt: self.excerpt.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            meta_description: self.meta_description.unwrap_or_default(),
            published: self.published.unwrap_or(true),
            featured: self.featured.unwrap_or(false),
            date: self.date.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn draft(slug: &str) -> PostDraft {
        PostDraft {
            slug: slug.to_string(),
            title: "Гарчиг".into(),
            category: "Advent".into(),
            published: true,
            ..PostDraft::default()
        }
    }

    #[test]
    fn create_assigns_identity_and_timestamps() {
        let post = Post::create(draft("a"), datetime!(2024-03-01 10:00 UTC));
        assert!(post.id.starts_with("post_1709287200000_"));
        assert_eq!(post.created_at, "2024-03-01T10:00:00Z");
        assert_eq!(post.updated_at.as_deref(), Some("2024-03-01T10:00:00Z"));
        assert_eq!(post.date, "2024-03-01T10:00:00Z");
    }

    #[test]
    fn patch_never_touches_identity() {
        let mut post = Post::create(draft("a"), datetime!(2024-03-01 10:00 UTC));
        let before = post.clone();
        let patch: PostPatch = serde_json::from_value(serde_json::json!({
            "id": "forged",
            "createdAt": "1999-01-01T00:00:00Z",
            "title": "Шинэ",
            "featured": true
        }))
        .expect("patch");

        post.apply_patch(patch, datetime!(2024-04-01 10:00 UTC))
            .expect("apply");

        assert_eq!(post.id, before.id);
        assert_eq!(post.created_at, before.created_at);
        assert_eq!(post.title, "Шинэ");
        assert!(post.featured);
        assert_eq!(post.updated_at.as_deref(), Some("2024-04-01T10:00:00Z"));
    }

    #[test]
    fn normalize_derives_missing_slug_from_title() {
        let draft = PostDraft {
            title: "Advent Season 2024".into(),
            ..PostDraft::default()
        };
        let draft = draft.normalize().expect("normalize");
        assert_eq!(draft.slug, "advent-season-2024");
    }

    #[test]
    fn stored_values_tolerate_missing_fields() {
        let post: Post = serde_json::from_str(r#"{"slug":"old","title":"T"}"#).expect("parse");
        assert!(post.published);
        assert!(!post.featured);
        assert!(post.meta_description.is_empty());
        assert!(post.updated_at.is_none());
    }

    #[test]
    fn renamed_slug_ignores_same_or_blank_slug() {
        let patch = PostPatch {
            slug: Some("a".into()),
            ..PostPatch::default()
        };
        assert_eq!(patch.renamed_slug("a"), None);
        let patch = PostPatch {
            slug: Some(" b ".into()),
            ..PostPatch::default()
        };
        assert_eq!(patch.renamed_slug("a"), Some("b"));
    }
}
