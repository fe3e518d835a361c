#![allow(dead_code)]

use std::sync::Arc;

use axum::{Router, body::Body, http::Response};
use http_body_util::BodyExt;
use medee::application::assets::{AssetService, AssetUrls};
use medee::application::catalog::CatalogService;
use medee::application::content::ContentStore;
use medee::domain::keys::KeyScheme;
use medee::domain::posts::Post;
use medee::infra::http::{ApiState, HttpState, build_api_router, build_router};
use medee::infra::memory::{MemoryKvStore, MemoryObjectStore};
use serde_json::{Value, json};

pub const SECRET: &str = "test-secret";
pub const BODY_LIMIT: usize = 1024 * 1024;

pub struct Harness {
    pub kv: Arc<MemoryKvStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub content: Arc<ContentStore>,
}

impl Harness {
    pub fn new() -> Self {
        let kv = Arc::new(MemoryKvStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let content = Arc::new(ContentStore::remote(kv.clone(), KeyScheme::default()));
        Self {
            kv,
            objects,
            content,
        }
    }

    pub fn seed(&self, key: &str, post: &Post) {
        let raw = serde_json::to_vec(post).expect("encode post");
        self.kv.insert_raw(key, raw);
    }

    pub fn api(&self, secret: Option<&str>, urls: AssetUrls) -> Router {
        let assets = Arc::new(AssetService::new(self.objects.clone(), None, urls));
        build_api_router(
            ApiState {
                content: self.content.clone(),
                assets,
                token_secret: secret.map(Arc::from),
            },
            BODY_LIMIT,
        )
    }

    pub fn public(&self, urls: AssetUrls) -> Router {
        build_router(HttpState {
            catalog: Arc::new(CatalogService::new(self.content.clone())),
            assets: urls,
            local_assets: None,
        })
    }
}

pub fn post(slug: &str, category: &str) -> Post {
    serde_json::from_value(json!({
        "id": format!("id-{slug}"),
        "slug": slug,
        "title": format!("Title {slug}"),
        "excerpt": "one two three",
        "content": "**bold** text",
        "category": category,
        "image": "",
        "published": true,
        "featured": false,
        "date": "2024-12-01",
        "createdAt": "2024-12-01T00:00:00Z"
    }))
    .expect("valid post")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf-8 body")
}
