//! Request and response envelopes for the medee admin API.
//!
//! Post bodies themselves are owned by the server crate; the envelopes here are
//! generic over the item type so that clients can plug in their own post model
//! or fall back to [`serde_json::Value`].

use serde::{Deserialize, Serialize};

/// `GET /posts`: slugs of every stored post, prefix stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostKeysResponse {
    pub keys: Vec<String>,
}

/// `GET /posts-full`: fully resolved posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostsResponse<T = serde_json::Value> {
    pub posts: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: String,
}

/// `POST /upload-image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub key: String,
    /// Root-relative path, always present.
    pub path: String,
    /// Absolute URL when a public base is configured, otherwise the path.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub key: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<String>,
    pub size: u64,
}

/// `GET /images`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagesResponse {
    pub images: Vec<ImageEntry>,
}

/// Body of every non-2xx admin response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploaded_is_omitted_when_unknown() {
        let entry = ImageEntry {
            key: "images/1-a.png".into(),
            url: "/images/1-a.png".into(),
            uploaded: None,
            size: 3,
        };
        let json = serde_json::to_value(&entry).expect("serialize");
        assert!(json.get("uploaded").is_none());
        assert_eq!(json["size"], 3);
    }
}
