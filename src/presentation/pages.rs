//! Page assembly shared by the HTTP handlers and the static exporter.

use crate::application::assets::AssetUrls;
use crate::application::catalog::{CatalogService, PostFilter, RenderContext};
use crate::application::content::ContentError;
use crate::application::markdown::render_markdown;
use crate::domain::categories::{self, GOSPEL};

use super::views::{
    ARTICLES_HEADING, ListingTemplate, ListingView, PostDetailView, PostTemplate, SiteChrome,
};

/// The listing pages of the public site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingPage {
    /// `/`, optionally narrowed by `?category=`.
    Home { category: Option<String> },
    /// `/niitlel`
    Articles,
    /// `/sain-medee`
    Gospel,
    /// `/category/{label}`
    Category(String),
}

impl ListingPage {
    pub fn home(category: Option<&str>) -> Self {
        Self::Home {
            category: categories::filter_from_query(category),
        }
    }

    fn category(&self) -> Option<&str> {
        match self {
            Self::Home { category } => category.as_deref(),
            Self::Articles => None,
            Self::Gospel => Some(GOSPEL),
            Self::Category(label) => Some(label),
        }
    }

    pub fn filter(&self) -> PostFilter {
        PostFilter::published().in_category(self.category())
    }

    pub fn heading(&self) -> String {
        self.category().unwrap_or(ARTICLES_HEADING).to_string()
    }

    fn with_hero(&self) -> bool {
        matches!(self, Self::Home { .. })
    }
}

pub async fn listing_page(
    catalog: &CatalogService,
    ctx: &RenderContext,
    urls: &AssetUrls,
    page: &ListingPage,
) -> ListingTemplate {
    let listing = catalog.listing(ctx, &page.filter()).await;
    ListingTemplate {
        chrome: SiteChrome::new(page.category()),
        view: ListingView::new(page.heading(), &listing, urls, page.with_hero()),
    }
}

pub enum PostPage {
    Found(Box<PostTemplate>),
    NotFound,
    Failed(ContentError),
}

pub async fn post_page(
    catalog: &CatalogService,
    ctx: &RenderContext,
    urls: &AssetUrls,
    slug: &str,
) -> PostPage {
    match catalog.detail(ctx, slug).await {
        Ok(Some(detail)) => {
            let content_html = render_markdown(&detail.post.content);
            let view = PostDetailView::new(&detail, content_html, urls);
            PostPage::Found(Box::new(PostTemplate {
                chrome: SiteChrome::new(Some(detail.post.category.as_str())),
                view,
            }))
        }
        Ok(None) => PostPage::NotFound,
        Err(err) => PostPage::Failed(err),
    }
}
