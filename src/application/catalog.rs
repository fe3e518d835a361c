//! Public read model: filtering, hero selection and related posts, computed
//! in memory over the full collection.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::warn;

use crate::application::content::{ContentError, ContentStore};
use crate::domain::categories;
use crate::domain::posts::Post;
use crate::domain::slug::{decode_component, static_slug_variants};

pub const RELATED_LIMIT: usize = 2;
pub const HERO_EXCERPT_WORDS: usize = 20;

/// Holds the collection for a single render pass. Create one per request
/// when serving, or one for a whole export run.
#[derive(Debug, Default)]
pub struct RenderContext {
    posts: OnceCell<Arc<Vec<Post>>>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.posts.initialized()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub published: Option<bool>,
    pub category: Option<String>,
    pub featured: Option<bool>,
}

impl PostFilter {
    pub fn published() -> Self {
        Self {
            published: Some(true),
            ..Self::default()
        }
    }

    /// `None` and the "all" sentinel leave the category unconstrained.
    pub fn in_category(mut self, category: Option<&str>) -> Self {
        self.category = categories::filter_from_query(category);
        self
    }

    pub fn matches(&self, post: &Post) -> bool {
        self.published.is_none_or(|value| post.published == value)
            && self.featured.is_none_or(|value| post.featured == value)
            && self
                .category
                .as_deref()
                .is_none_or(|category| post.category == category)
    }

    pub fn apply(&self, posts: &[Post]) -> Vec<Post> {
        posts
            .iter()
            .filter(|post| self.matches(post))
            .cloned()
            .collect()
    }
}

/// First featured post, else the first post in list order.
pub fn hero(posts: &[Post]) -> Option<&Post> {
    let featured = PostFilter {
        featured: Some(true),
        ..PostFilter::default()
    };
    posts
        .iter()
        .find(|post| featured.matches(post))
        .or_else(|| posts.first())
}

/// Up to `limit` posts sharing the category of `current`, excluding it.
pub fn related<'a>(posts: &'a [Post], current: &Post, limit: usize) -> Vec<&'a Post> {
    posts
        .iter()
        .filter(|post| post.category == current.category && post.slug != current.slug)
        .take(limit)
        .collect()
}

/// Keep the first `limit` whitespace-separated words, appending `...` when
/// anything was cut.
pub fn truncate_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return words.join(" ");
    }
    format!("{}...", words[..limit].join(" "))
}

/// Look a post up by slug, accepting the percent-encoded form as well.
pub fn find_by_slug<'a>(posts: &'a [Post], slug: &str) -> Option<&'a Post> {
    posts.iter().find(|post| post.slug == slug).or_else(|| {
        let decoded = decode_component(slug).ok()?;
        posts.iter().find(|post| post.slug == decoded)
    })
}

#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub posts: Vec<Post>,
    pub hero: Option<Post>,
    /// The store failed and the listing fell back to empty.
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: Post,
    pub related: Vec<Post>,
}

#[derive(Clone)]
pub struct CatalogService {
    content: Arc<ContentStore>,
}

impl CatalogService {
    pub fn new(content: Arc<ContentStore>) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &Arc<ContentStore> {
        &self.content
    }

    /// The full collection, fetched at most once per context.
    pub async fn posts(&self, ctx: &RenderContext) -> Result<Arc<Vec<Post>>, ContentError> {
        ctx.posts
            .get_or_try_init(|| async { self.content.get_all_posts().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Published posts matching `filter`. Store failures degrade to an
    /// empty listing.
    pub async fn listing(&self, ctx: &RenderContext, filter: &PostFilter) -> Listing {
        match self.posts(ctx).await {
            Ok(posts) => {
                let posts = filter.apply(&posts);
                let hero = hero(&posts).cloned();
                Listing {
                    posts,
                    hero,
                    degraded: false,
                }
            }
            Err(err) => {
                warn!(
                    target = "medee::application::catalog",
                    error = %err,
                    "listing degraded to empty after store failure"
                );
                Listing {
                    degraded: true,
                    ..Listing::default()
                }
            }
        }
    }

    /// A published post and its related posts. `Ok(None)` when no published
    /// post has the slug.
    pub async fn detail(
        &self,
        ctx: &RenderContext,
        slug: &str,
    ) -> Result<Option<PostDetail>, ContentError> {
        let posts = self.posts(ctx).await?;
        let published = PostFilter::published().apply(&posts);
        let Some(post) = find_by_slug(&published, slug) else {
            return Ok(None);
        };
        let related = related(&published, post, RELATED_LIMIT)
            .into_iter()
            .cloned()
            .collect();
        Ok(Some(PostDetail {
            post: post.clone(),
            related,
        }))
    }

    /// Every published slug in decoded and percent-encoded form.
    pub async fn static_paths(&self, ctx: &RenderContext) -> Result<Vec<String>, ContentError> {
        let posts = self.posts(ctx).await?;
        Ok(static_slug_variants(
            posts
                .iter()
                .filter(|post| post.published)
                .map(|post| post.slug.as_str()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixture::FixtureSource;
    use crate::domain::categories::{ALL, GOSPEL};
    use crate::domain::keys::KeyScheme;

    fn post(slug: &str, category: &str, featured: bool, published: bool) -> Post {
        Post {
            id: format!("id-{slug}"),
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            excerpt: String::new(),
            content: String::new(),
            category: category.to_string(),
            image: String::new(),
            meta_description: String::new(),
            published,
            featured,
            date: "2024-01-01".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: None,
        }
    }

    fn catalog(posts: Vec<Post>) -> CatalogService {
        let store = ContentStore::fixture(FixtureSource::from_posts(posts), KeyScheme::default());
        CatalogService::new(Arc::new(store))
    }

    #[test]
    fn hero_prefers_featured_then_first() {
        let posts = vec![post("a", "Advent", false, true), post("b", "Advent", true, true)];
        assert_eq!(hero(&posts).map(|p| p.slug.as_str()), Some("b"));

        let plain = vec![post("a", "Advent", false, true), post("b", "Advent", false, true)];
        assert_eq!(hero(&plain).map(|p| p.slug.as_str()), Some("a"));
        assert!(hero(&[]).is_none());
    }

    #[test]
    fn related_excludes_current_and_caps() {
        let posts = vec![
            post("a", GOSPEL, false, true),
            post("b", GOSPEL, false, true),
            post("c", GOSPEL, false, true),
            post("d", GOSPEL, false, true),
            post("e", "Advent", false, true),
        ];
        let related = related(&posts, &posts[0], RELATED_LIMIT);
        let slugs: Vec<&str> = related.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "c"]);
    }

    #[test]
    fn truncate_words_appends_ellipsis_only_when_cut() {
        assert_eq!(truncate_words("one two three", 5), "one two three");
        assert_eq!(truncate_words("one two three", 2), "one two...");
    }

    #[test]
    fn filter_all_sentinel_keeps_every_category() {
        let posts = vec![post("a", GOSPEL, false, true), post("b", "Advent", false, true)];
        let filter = PostFilter::published().in_category(Some(ALL));
        assert_eq!(filter.apply(&posts).len(), 2);

        let gospel = PostFilter::published().in_category(Some(GOSPEL));
        assert_eq!(gospel.apply(&posts).len(), 1);
    }

    #[tokio::test]
    async fn listing_hides_unpublished_posts() {
        let catalog = catalog(vec![
            post("a", GOSPEL, false, true),
            post("draft", GOSPEL, true, false),
        ]);
        let ctx = RenderContext::new();
        let listing = catalog.listing(&ctx, &PostFilter::published()).await;
        assert_eq!(listing.posts.len(), 1);
        assert_eq!(listing.hero.map(|p| p.slug), Some("a".to_string()));
        assert!(!listing.degraded);
        assert!(ctx.is_loaded());
    }

    #[tokio::test]
    async fn detail_accepts_encoded_slug() {
        let catalog = catalog(vec![post("сайн", GOSPEL, false, true)]);
        let ctx = RenderContext::new();
        let detail = catalog
            .detail(&ctx, "%D1%81%D0%B0%D0%B9%D0%BD")
            .await
            .unwrap()
            .expect("post resolves");
        assert_eq!(detail.post.slug, "сайн");
    }

    #[tokio::test]
    async fn unconfigured_store_degrades_listing() {
        let catalog = CatalogService::new(Arc::new(ContentStore::unconfigured("no credentials")));
        let ctx = RenderContext::new();
        let listing = catalog.listing(&ctx, &PostFilter::published()).await;
        assert!(listing.degraded);
        assert!(listing.posts.is_empty());
        assert!(catalog.detail(&ctx, "a").await.is_err());
    }
}
