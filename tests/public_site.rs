mod support;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use medee::application::assets::AssetUrls;
use medee::application::catalog::CatalogService;
use medee::domain::slug::encode_component;
use medee::infra::export::SiteExporter;
use medee::infra::memory::KvOp;
use support::{Harness, body_text, post};
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn seeded() -> Harness {
    let harness = Harness::new();
    let mut featured = post("featured", "Advent");
    featured.featured = true;
    let mut draft = post("draft", "Advent");
    draft.published = false;

    harness.seed("post:a-first", &post("a-first", "Advent"));
    harness.seed("post:draft", &draft);
    harness.seed("post:featured", &featured);
    harness.seed("post:gospel", &post("gospel", "Сайн мэдээ"));
    harness
}

#[tokio::test]
async fn health_is_no_content() {
    let app = Harness::new().public(AssetUrls::default());
    let response = app.oneshot(get("/_health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn home_lists_published_posts_only() {
    let app = seeded().public(AssetUrls::default());
    let response = app.oneshot(get("/")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("/post/featured/"));
    assert!(html.contains("/post/a-first/"));
    assert!(!html.contains("/post/draft/"));
}

#[tokio::test]
async fn category_filter_narrows_listing() {
    let app = seeded().public(AssetUrls::default());
    let uri = format!("/?category={}", encode_component("Сайн мэдээ"));
    let response = app.clone().oneshot(get(&uri)).await.expect("response");
    let html = body_text(response).await;
    assert!(html.contains("/post/gospel/"));
    assert!(!html.contains("/post/a-first/"));

    let response = app.oneshot(get("/sain-medee")).await.expect("response");
    let html = body_text(response).await;
    assert!(html.contains("/post/gospel/"));
    assert!(!html.contains("/post/featured/"));
}

#[tokio::test]
async fn unknown_category_is_404() {
    let app = seeded().public(AssetUrls::default());
    let response = app
        .oneshot(get("/category/not-a-label"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn detail_renders_markdown_and_related_posts() {
    let app = seeded().public(AssetUrls::default());
    let response = app.oneshot(get("/post/a-first")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("<strong>bold</strong>"));
    assert!(html.contains("/post/featured/"));
    assert!(!html.contains("/post/gospel/"));
}

#[tokio::test]
async fn unpublished_and_unknown_slugs_are_404() {
    let app = seeded().public(AssetUrls::default());
    for uri in ["/post/draft", "/post/ghost/"] {
        let response = app.clone().oneshot(get(uri)).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn store_failure_degrades_listing_and_fails_detail() {
    let harness = seeded();
    harness.kv.fail_op(KvOp::List);
    let app = harness.public(AssetUrls::default());

    let response = app.clone().oneshot(get("/")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Нийтлэл олдсонгүй."));

    let response = app.oneshot(get("/post/a-first")).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("Алдаа гарлаа"));
}

#[tokio::test]
async fn export_writes_trailing_slash_tree() {
    let harness = seeded();
    harness.seed("post:сайн", &post("сайн", "Сайн мэдээ"));
    let catalog = CatalogService::new(harness.content.clone());
    let urls = AssetUrls::default();
    let out = tempfile::tempdir().expect("tempdir");

    let report = SiteExporter::new(&catalog, &urls, out.path())
        .export()
        .await
        .expect("export");

    let root = out.path();
    assert!(root.join("index.html").is_file());
    assert!(root.join("niitlel/index.html").is_file());
    assert!(root.join("sain-medee/index.html").is_file());
    assert!(root.join("404.html").is_file());
    assert!(
        root.join(format!("category/{}/index.html", encode_component("Advent")))
            .is_file()
    );
    assert!(root.join("post/a-first/index.html").is_file());
    assert!(root.join("post/сайн/index.html").is_file());
    assert!(
        root.join(format!("post/{}/index.html", encode_component("сайн")))
            .is_file()
    );
    assert!(!root.join("post/draft").exists());
    assert!(report.skipped.is_empty());

    // One listing plus one read per post for the whole run.
    let posts = 5;
    assert_eq!(harness.kv.calls(), 1 + posts);
}
