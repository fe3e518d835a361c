use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::assets::AssetUrls;
use crate::application::catalog::{HERO_EXCERPT_WORDS, Listing, PostDetail, truncate_words};
use crate::application::error::{ErrorReport, HttpError};
use crate::domain::categories::{self, ALL};
use crate::domain::posts::Post;
use crate::domain::slug::encode_component;

pub const SITE_TITLE: &str = "Udaxgui.com - Нийтлэл";
pub const ARTICLES_HEADING: &str = "Нийтлэлүүд";
const EMPTY_LISTING: &str = "Нийтлэл олдсонгүй.";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response() -> Response {
    let template = ErrorTemplate {
        chrome: SiteChrome::new(None),
        view: ErrorPageView::not_found(),
    };
    let mut response = render_template_response(template, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Page shown when the post collection could not be loaded.
pub fn render_load_failure_response(detail: &dyn std::error::Error) -> Response {
    let template = ErrorTemplate {
        chrome: SiteChrome::new(None),
        view: ErrorPageView::load_failed(),
    };
    let mut response = render_template_response(template, StatusCode::INTERNAL_SERVER_ERROR);
    ErrorReport::from_error(
        "presentation::views::render_load_failure_response",
        StatusCode::INTERNAL_SERVER_ERROR,
        detail,
    )
    .attach(&mut response);
    response
}

pub fn post_href(slug: &str) -> String {
    format!("/post/{}/", encode_component(slug))
}

pub fn category_href(label: &str) -> String {
    if label == ALL {
        return "/".to_string();
    }
    format!("/category/{}/", encode_component(label))
}

#[derive(Clone, Debug)]
pub struct NavLink {
    pub label: String,
    pub href: String,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct SiteChrome {
    pub title: &'static str,
    pub categories: Vec<NavLink>,
}

impl SiteChrome {
    /// `active` is the category currently being browsed, if any.
    pub fn new(active: Option<&str>) -> Self {
        let active = active.unwrap_or(ALL);
        let categories = std::iter::once(ALL)
            .chain(categories::LABELS)
            .map(|label| NavLink {
                label: label.to_string(),
                href: category_href(label),
                active: label == active,
            })
            .collect();
        Self {
            title: SITE_TITLE,
            categories,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub excerpt: String,
    pub category: String,
    pub date: String,
    pub image_url: String,
}

impl PostCard {
    pub fn from_post(post: &Post, urls: &AssetUrls) -> Self {
        Self {
            href: post_href(&post.slug),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            category: post.category.clone(),
            date: post.date.clone(),
            image_url: urls.resolve(&post.image),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ListingView {
    pub heading: String,
    pub hero: Option<PostCard>,
    pub posts: Vec<PostCard>,
    pub empty_message: &'static str,
}

impl ListingView {
    pub fn new(heading: impl Into<String>, listing: &Listing, urls: &AssetUrls, with_hero: bool) -> Self {
        let hero = listing.hero.as_ref().filter(|_| with_hero).map(|post| {
            let mut card = PostCard::from_post(post, urls);
            card.excerpt = truncate_words(&post.excerpt, HERO_EXCERPT_WORDS);
            card
        });
        Self {
            heading: heading.into(),
            hero,
            posts: listing
                .posts
                .iter()
                .map(|post| PostCard::from_post(post, urls))
                .collect(),
            empty_message: EMPTY_LISTING,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostDetailView {
    pub title: String,
    pub category: String,
    pub date: String,
    pub meta_description: String,
    pub image_url: String,
    pub content_html: String,
    pub related: Vec<PostCard>,
}

impl PostDetailView {
    pub fn new(detail: &PostDetail, content_html: String, urls: &AssetUrls) -> Self {
        let post = &detail.post;
        let meta_description = if post.meta_description.is_empty() {
            post.excerpt.clone()
        } else {
            post.meta_description.clone()
        };
        Self {
            title: post.title.clone(),
            category: post.category.clone(),
            date: post.date.clone(),
            meta_description,
            image_url: urls.resolve(&post.image),
            content_html,
            related: detail
                .related
                .iter()
                .map(|post| PostCard::from_post(post, urls))
                .collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ErrorPageView {
    pub status_code: u16,
    pub title: &'static str,
    pub message: &'static str,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            status_code: 404,
            title: "Нийтлэл олдсонгүй",
            message: "Таны хайсан хуудас олдсонгүй.",
        }
    }

    pub fn load_failed() -> Self {
        Self {
            status_code: 500,
            title: "Алдаа гарлаа",
            message: "Нийтлэлийг ачаалахад алдаа гарлаа. Та дахин оролдоно уу.",
        }
    }
}

#[derive(Template)]
#[template(path = "listing.html")]
pub struct ListingTemplate {
    pub chrome: SiteChrome,
    pub view: ListingView,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub chrome: SiteChrome,
    pub view: PostDetailView,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub chrome: SiteChrome,
    pub view: ErrorPageView,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(slug: &str) -> Post {
        Post {
            id: "1".into(),
            slug: slug.into(),
            title: "Гарчиг".into(),
            excerpt: "a b c".into(),
            content: String::new(),
            category: "Advent".into(),
            image: String::new(),
            meta_description: String::new(),
            published: true,
            featured: false,
            date: "2024-01-01".into(),
            created_at: String::new(),
            updated_at: None,
        }
    }

    #[test]
    fn hrefs_use_encoded_slugs_and_trailing_slash() {
        assert_eq!(post_href("ab c"), "/post/ab%20c/");
        assert_eq!(category_href(ALL), "/");
        assert_eq!(category_href("Advent"), "/category/Advent/");
    }

    #[test]
    fn chrome_marks_active_category() {
        let chrome = SiteChrome::new(Some("Advent"));
        let active: Vec<&str> = chrome
            .categories
            .iter()
            .filter(|link| link.active)
            .map(|link| link.label.as_str())
            .collect();
        assert_eq!(active, vec!["Advent"]);
        assert_eq!(chrome.categories.len(), 7);
    }

    #[test]
    fn listing_template_renders_cards() {
        let listing = Listing {
            posts: vec![post("a")],
            hero: Some(post("a")),
            degraded: false,
        };
        let template = ListingTemplate {
            chrome: SiteChrome::new(None),
            view: ListingView::new(ARTICLES_HEADING, &listing, &AssetUrls::default(), true),
        };
        let html = template.render().expect("render");
        assert!(html.contains("/post/a/"));
        assert!(html.contains("Гарчиг"));
        assert!(html.contains("/placeholder.svg"));
    }

    #[test]
    fn empty_listing_shows_message() {
        let template = ListingTemplate {
            chrome: SiteChrome::new(None),
            view: ListingView::new(ARTICLES_HEADING, &Listing::default(), &AssetUrls::default(), true),
        };
        let html = template.render().expect("render");
        assert!(html.contains(EMPTY_LISTING));
    }

    #[test]
    fn post_template_does_not_escape_rendered_markdown() {
        let detail = PostDetail {
            post: post("a"),
            related: vec![post("b")],
        };
        let view = PostDetailView::new(&detail, "<p><strong>hi</strong></p>".into(), &AssetUrls::default());
        let html = PostTemplate {
            chrome: SiteChrome::new(Some("Advent")),
            view,
        }
        .render()
        .expect("render");
        assert!(html.contains("<p><strong>hi</strong></p>"));
        assert!(html.contains("/post/b/"));
    }
}
