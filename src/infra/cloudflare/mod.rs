//! REST clients for the Cloudflare key-value and object storage APIs.

mod kv;
mod r2;

pub use kv::CloudflareKv;
pub use r2::{CloudflareR2, UnavailableObjectStore};

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;

use crate::application::stores::StoreError;
use crate::domain::slug::encode_component;
use crate::infra::error::InfraError;

const PAGE_LIMIT: &str = "1000";

#[derive(Clone, Debug)]
struct ApiClient {
    http: Client,
    base: Url,
    token: String,
    store: &'static str,
}

impl ApiClient {
    fn new(base: Url, token: String, store: &'static str) -> Result<Self, InfraError> {
        let http = Client::builder()
            .user_agent(concat!("medee/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::HttpClient(err.to_string()))?;
        Ok(Self {
            http,
            base,
            token,
            store,
        })
    }

    /// `<base>/<path>[/<encoded key>]`.
    fn url(&self, path: &str, key: Option<&str>) -> Result<Url, StoreError> {
        let mut raw = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_matches('/')
        );
        if let Some(key) = key {
            raw.push('/');
            raw.push_str(&encode_component(key));
        }
        Url::parse(&raw).map_err(|_| StoreError::InvalidKey(raw))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        request
            .send()
            .await
            .map_err(|err| StoreError::transport(self.store, err))
    }

    /// Turn a non-success response into an upstream error carrying the body.
    async fn ensure_success(&self, response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::upstream(
            self.store,
            status.as_u16(),
            summarize_errors(&body),
        ))
    }

    async fn json<T: for<'de> Deserialize<'de>>(&self, response: Response) -> Result<T, StoreError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|err| StoreError::transport(self.store, err))?;
        serde_json::from_slice(&bytes).map_err(|err| {
            StoreError::upstream(self.store, 200, format!("unexpected response body: {err}"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    is_truncated: Option<bool>,
}

impl<T> Envelope<T> {
    fn into_result(self, store: &'static str) -> Result<(T, Option<String>), StoreError> {
        if !self.success {
            return Err(StoreError::upstream(store, 200, join_messages(&self.errors)));
        }
        let result = self
            .result
            .ok_or_else(|| StoreError::upstream(store, 200, "response carried no result"))?;
        let info = self.result_info.unwrap_or_default();
        let cursor = info
            .cursor
            .filter(|cursor| !cursor.is_empty())
            .filter(|_| info.is_truncated.unwrap_or(true));
        Ok((result, cursor))
    }
}

fn join_messages(messages: &[ApiMessage]) -> String {
    if messages.is_empty() {
        return "request was not successful".to_string();
    }
    messages
        .iter()
        .map(|msg| format!("{}: {}", msg.code, msg.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn summarize_errors(body: &str) -> String {
    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => join_messages(&envelope.errors),
        _ => body.chars().take(200).collect(),
    }
}
