use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::application::stores::{KvStore, StoreError};
use crate::config::KvCredentials;
use crate::infra::error::InfraError;
use crate::infra::telemetry::record_store_request;

use super::{ApiClient, Envelope, PAGE_LIMIT};

const STORE: &str = "kv";

#[derive(Debug, Deserialize)]
struct KeyEntry {
    name: String,
}

/// Workers KV namespace accessed over the Cloudflare REST API.
#[derive(Clone, Debug)]
pub struct CloudflareKv {
    client: ApiClient,
    namespace_path: String,
}

impl CloudflareKv {
    pub fn new(credentials: KvCredentials) -> Result<Self, InfraError> {
        let namespace_path = format!(
            "accounts/{}/storage/kv/namespaces/{}",
            credentials.account_id, credentials.namespace_id
        );
        Ok(Self {
            client: ApiClient::new(credentials.api_base, credentials.api_token, STORE)?,
            namespace_path,
        })
    }

    async fn list_page(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<(Vec<KeyEntry>, Option<String>), StoreError> {
        let mut url = self
            .client
            .url(&format!("{}/keys", self.namespace_path), None)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", PAGE_LIMIT);
            if let Some(prefix) = prefix {
                query.append_pair("prefix", prefix);
            }
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }

        let response = self
            .client
            .send(self.client.request(Method::GET, url))
            .await?;
        let response = self.client.ensure_success(response).await?;
        let envelope: Envelope<Vec<KeyEntry>> = self.client.json(response).await?;
        envelope.into_result(STORE)
    }

    fn value_url(&self, key: &str) -> Result<reqwest::Url, StoreError> {
        self.client
            .url(&format!("{}/values", self.namespace_path), Some(key))
    }

    async fn get_inner(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let url = self.value_url(key)?;
        let response = self
            .client
            .send(self.client.request(Method::GET, url))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.client.ensure_success(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| StoreError::transport(STORE, err))?;
        Ok(Some(body))
    }

    async fn put_inner(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        let url = self.value_url(key)?;
        let request = self
            .client
            .request(Method::PUT, url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(value);
        let response = self.client.send(request).await?;
        self.client.ensure_success(response).await?;
        Ok(())
    }

    async fn delete_inner(&self, key: &str) -> Result<(), StoreError> {
        let url = self.value_url(key)?;
        let response = self
            .client
            .send(self.client.request(Method::DELETE, url))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.client.ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for CloudflareKv {
    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;
        let result = loop {
            match self.list_page(prefix, cursor.as_deref()).await {
                Ok((page, next)) => {
                    keys.extend(page.into_iter().map(|entry| entry.name));
                    match next {
                        Some(next) => cursor = Some(next),
                        None => break Ok(()),
                    }
                }
                Err(err) => break Err(err),
            }
        };
        record_store_request(STORE, "list", result.is_ok());
        result?;
        debug!(
            target = "medee::infra::cloudflare::kv",
            prefix = prefix.unwrap_or(""),
            count = keys.len(),
            "listed keys"
        );
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let result = self.get_inner(key).await;
        record_store_request(STORE, "get", result.is_ok());
        result
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        let result = self.put_inner(key, value).await;
        record_store_request(STORE, "put", result.is_ok());
        result
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let result = self.delete_inner(key).await;
        record_store_request(STORE, "delete", result.is_ok());
        result
    }
}
