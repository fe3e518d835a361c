use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        assets::AssetUrls,
        catalog::{CatalogService, RenderContext},
        error::HttpError,
        stores::StoreError,
    },
    domain::categories,
    infra::filesystem::FilesystemObjectStore,
    presentation::{
        pages::{ListingPage, PostPage, listing_page, post_page},
        views::{render_load_failure_response, render_not_found_response, render_template_response},
    },
};

use super::middleware::{log_responses, set_request_context};

const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="1200" height="630" viewBox="0 0 1200 630"><rect width="1200" height="630" fill="#e5e7eb"/><path d="M540 270h120v90H540z" fill="#9ca3af"/></svg>"##;

/// Locally stored uploads served by the public listener.
#[derive(Clone)]
pub struct LocalAssets {
    pub prefix: String,
    pub store: Arc<FilesystemObjectStore>,
}

#[derive(Clone)]
pub struct HttpState {
    pub catalog: Arc<CatalogService>,
    pub assets: AssetUrls,
    pub local_assets: Option<LocalAssets>,
}

pub fn build_router(state: HttpState) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/niitlel", get(articles))
        .route("/niitlel/", get(articles))
        .route("/sain-medee", get(gospel))
        .route("/sain-medee/", get(gospel))
        .route("/category/{label}", get(category_index))
        .route("/category/{label}/", get(category_index))
        .route("/post/{slug}", get(post_detail))
        .route("/post/{slug}/", get(post_detail))
        .route("/placeholder.svg", get(placeholder))
        .route("/_health", get(health));

    if let Some(local) = &state.local_assets {
        let prefix = local.prefix.trim_matches('/');
        router = router.route(&format!("/{prefix}/{{*path}}"), get(serve_local_asset));
    }

    router
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryQuery {
    category: Option<String>,
}

async fn index(State(state): State<HttpState>, Query(query): Query<CategoryQuery>) -> Response {
    render_listing(&state, ListingPage::home(query.category.as_deref())).await
}

async fn articles(State(state): State<HttpState>) -> Response {
    render_listing(&state, ListingPage::Articles).await
}

async fn gospel(State(state): State<HttpState>) -> Response {
    render_listing(&state, ListingPage::Gospel).await
}

async fn category_index(State(state): State<HttpState>, Path(label): Path<String>) -> Response {
    if !categories::is_known(&label) {
        return render_not_found_response();
    }
    render_listing(&state, ListingPage::Category(label)).await
}

async fn render_listing(state: &HttpState, page: ListingPage) -> Response {
    let ctx = RenderContext::new();
    let template = listing_page(&state.catalog, &ctx, &state.assets, &page).await;
    render_template_response(template, StatusCode::OK)
}

async fn post_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let ctx = RenderContext::new();
    match post_page(&state.catalog, &ctx, &state.assets, &slug).await {
        PostPage::Found(template) => render_template_response(*template, StatusCode::OK),
        PostPage::NotFound => render_not_found_response(),
        PostPage::Failed(err) => {
            error!(
                target = "medee::http::public::post_detail",
                slug = %slug,
                error = %err,
                "failed to load post"
            );
            render_load_failure_response(&err)
        }
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found() -> Response {
    render_not_found_response()
}

async fn placeholder() -> Response {
    let mut response = Response::new(Body::from(PLACEHOLDER_SVG));
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("image/svg+xml; charset=utf-8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"));
    response
}

async fn serve_local_asset(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_local_asset";

    let Some(local) = state.local_assets.as_ref() else {
        return render_not_found_response();
    };
    let key = format!("{}/{}", local.prefix.trim_matches('/'), path);

    match local.store.read(&key).await {
        Ok(bytes) => build_asset_response(&key, bytes),
        Err(StoreError::InvalidKey(_)) => asset_not_found(SOURCE),
        Err(StoreError::Io(err)) if err.kind() == ErrorKind::NotFound => asset_not_found(SOURCE),
        Err(err) => {
            error!(
                target = SOURCE,
                key = %key,
                error = %err,
                "failed to read stored asset"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read asset",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn asset_not_found(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "Asset not found",
        "The requested asset is not available",
    )
    .into_response()
}

fn build_asset_response(key: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(key).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
