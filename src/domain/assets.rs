//! Asset key generation and public URL resolution.

use std::path::Path;

use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_ASSET_PREFIX: &str = "images";
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// Lowercased extension of an uploaded filename, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

/// `<prefix>/<unix-millis>-<uuid>.<ext>`.
pub fn asset_key(prefix: &str, original_name: &str, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let identifier = Uuid::new_v4().simple();
    let prefix = prefix.trim_matches('/');
    let stem = if prefix.is_empty() {
        format!("{millis}-{identifier}")
    } else {
        format!("{prefix}/{millis}-{identifier}")
    };

    match extension_of(original_name) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

/// Join a public base URL and an object key with exactly one slash.
pub fn public_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// Resolve a stored `image` field into something an `<img>` can load.
pub fn resolve_image_url(public_base: Option<&str>, image: &str) -> String {
    let image = image.trim();
    if image.is_empty() {
        return PLACEHOLDER_IMAGE.to_string();
    }
    if image.starts_with("http") {
        return image.to_string();
    }

    match public_base.map(str::trim).filter(|base| !base.is_empty()) {
        Some(base) => public_url(base, image),
        None => PLACEHOLDER_IMAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn key_keeps_original_extension() {
        let key = asset_key("images", "Photo.PNG", datetime!(2024-03-01 10:00 UTC));
        assert!(key.starts_with("images/1709287200000-"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn key_without_extension_has_no_dot() {
        let key = asset_key("/images/", "README", datetime!(2024-03-01 10:00 UTC));
        assert!(key.starts_with("images/"));
        assert!(!key.contains('.'));
    }

    #[test]
    fn public_url_joins_with_single_slash() {
        assert_eq!(
            public_url("https://cdn.example/", "images/a.png"),
            "https://cdn.example/images/a.png"
        );
        assert_eq!(
            public_url("https://cdn.example", "/images/a.png"),
            "https://cdn.example/images/a.png"
        );
    }

    #[test]
    fn resolve_image_url_rules() {
        let base = Some("https://cdn.example");
        assert_eq!(resolve_image_url(base, ""), PLACEHOLDER_IMAGE);
        assert_eq!(
            resolve_image_url(base, "https://elsewhere/x.webp"),
            "https://elsewhere/x.webp"
        );
        assert_eq!(
            resolve_image_url(base, "/images/advent.webp"),
            "https://cdn.example/images/advent.webp"
        );
        assert_eq!(resolve_image_url(None, "/images/advent.webp"), PLACEHOLDER_IMAGE);
    }
}
