use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::application::stores::{ObjectInfo, ObjectStore, StoreError};
use crate::config::R2Credentials;
use crate::infra::error::InfraError;
use crate::infra::telemetry::record_store_request;

use super::{ApiClient, Envelope, PAGE_LIMIT};

const STORE: &str = "r2";

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    key: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    last_modified: Option<String>,
}

/// R2 bucket accessed over the Cloudflare REST API.
#[derive(Clone, Debug)]
pub struct CloudflareR2 {
    client: ApiClient,
    objects_path: String,
}

impl CloudflareR2 {
    pub fn new(credentials: R2Credentials) -> Result<Self, InfraError> {
        let objects_path = format!(
            "accounts/{}/r2/buckets/{}/objects",
            credentials.account_id, credentials.bucket
        );
        Ok(Self {
            client: ApiClient::new(credentials.api_base, credentials.api_token, STORE)?,
            objects_path,
        })
    }

    async fn put_inner(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError> {
        let url = self.client.url(&self.objects_path, Some(key))?;
        let request = self
            .client
            .request(Method::PUT, url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        let response = self.client.send(request).await?;
        self.client.ensure_success(response).await?;
        Ok(())
    }

    async fn list_inner(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut url = self.client.url(&self.objects_path, None)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("per_page", PAGE_LIMIT);
                query.append_pair("prefix", prefix);
                if let Some(cursor) = cursor.as_deref() {
                    query.append_pair("cursor", cursor);
                }
            }
            let response = self
                .client
                .send(self.client.request(Method::GET, url))
                .await?;
            let response = self.client.ensure_success(response).await?;
            let envelope: Envelope<Vec<ObjectEntry>> = self.client.json(response).await?;
            let (page, next) = envelope.into_result(STORE)?;

            objects.extend(page.into_iter().map(|entry| ObjectInfo {
                uploaded: entry
                    .last_modified
                    .as_deref()
                    .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok()),
                size: entry.size,
                key: entry.key,
            }));

            match next {
                Some(next) => cursor = Some(next),
                None => return Ok(objects),
            }
        }
    }
}

#[async_trait]
impl ObjectStore for CloudflareR2 {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError> {
        let result = self.put_inner(key, body, content_type).await;
        record_store_request(STORE, "put", result.is_ok());
        result
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let result = self.list_inner(prefix).await;
        record_store_request(STORE, "list", result.is_ok());
        result
    }
}

/// Stand-in used when the bucket credentials are missing; every call fails
/// with [`StoreError::ConfigurationMissing`].
#[derive(Clone, Debug, Default)]
pub struct UnavailableObjectStore;

#[async_trait]
impl ObjectStore for UnavailableObjectStore {
    async fn put(&self, _key: &str, _body: Bytes, _content_type: &str) -> Result<(), StoreError> {
        Err(StoreError::ConfigurationMissing { store: STORE })
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        Err(StoreError::ConfigurationMissing { store: STORE })
    }
}
