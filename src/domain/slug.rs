//! Slug derivation, validation and percent-encoding helpers.
//!
//! Post slugs are free Unicode (most titles are Mongolian Cyrillic), so the
//! same post can be requested either by its raw slug or by the
//! `encodeURIComponent` form a browser produces. Static generation has to
//! register both spellings; [`static_slug_variants`] does that.

use std::borrow::Cow;
use std::collections::HashSet;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use slug::slugify;
use thiserror::Error;

use super::error::DomainError;

/// Characters left untouched by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("`{input}` is not a valid percent-encoded string")]
    InvalidEncoding { input: String },
}

/// Derive an ASCII slug from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Check that a slug can serve as a storage key and a single path segment.
pub fn validate_slug(slug: &str) -> Result<(), DomainError> {
    if slug.trim().is_empty() {
        return Err(DomainError::validation("slug must not be empty"));
    }
    if slug.contains('/') {
        return Err(DomainError::validation("slug must not contain `/`"));
    }
    if slug.chars().any(char::is_control) {
        return Err(DomainError::validation(
            "slug must not contain control characters",
        ));
    }
    Ok(())
}

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Strict inverse of [`encode_component`]: malformed escapes and invalid
/// UTF-8 are rejected instead of passed through.
pub fn decode_component(value: &str) -> Result<String, SlugError> {
    if has_malformed_escape(value) {
        return Err(SlugError::InvalidEncoding {
            input: value.to_string(),
        });
    }

    percent_decode_str(value)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| SlugError::InvalidEncoding {
            input: value.to_string(),
        })
}

fn has_malformed_escape(value: &str) -> bool {
    let bytes = value.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let valid = bytes
                .get(index + 1..index + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return true;
            }
            index += 3;
        } else {
            index += 1;
        }
    }
    false
}

/// Every spelling under which a detail page must be reachable, deduplicated in
/// first-seen order.
pub fn static_slug_variants<'a, I>(slugs: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut variants = Vec::new();
    let mut push = |value: String| {
        if seen.insert(value.clone()) {
            variants.push(value);
        }
    };

    for slug in slugs {
        match decode_component(slug) {
            Ok(decoded) => {
                let encoded = encode_component(&decoded);
                push(decoded);
                push(encoded);
            }
            Err(_) => {
                push(slug.to_string());
                push(encode_component(slug));
            }
        }
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_transliterates_cyrillic() {
        let slug = derive_slug("Сайн мэдээ").expect("slug");
        assert!(slug.is_ascii());
        assert!(slug.starts_with('s'));
        assert_eq!(slug.matches('-').count(), 1);
    }

    #[test]
    fn derive_slug_lowercases_ascii_titles() {
        assert_eq!(derive_slug("Hello, World!").expect("slug"), "hello-world");
    }

    #[test]
    fn derive_slug_rejects_blank_titles() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn validate_slug_rejects_path_separators() {
        assert!(validate_slug("a/b").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("амилал-1").is_ok());
    }

    #[test]
    fn encode_matches_uri_component_rules() {
        assert_eq!(encode_component("a b"), "a%20b");
        assert_eq!(encode_component("it's-(ok)!"), "it's-(ok)!");
        assert_eq!(encode_component("мэдээ"), "%D0%BC%D1%8D%D0%B4%D1%8D%D1%8D");
    }

    #[test]
    fn decode_rejects_malformed_escapes() {
        assert!(decode_component("100%").is_err());
        assert!(decode_component("%zz").is_err());
        assert!(decode_component("%FF").is_err());
        assert_eq!(decode_component("a%20b").expect("decode"), "a b");
    }

    #[test]
    fn static_variants_register_decoded_and_encoded_forms() {
        let variants = static_slug_variants(["мэдээ", "%D0%BC%D1%8D%D0%B4%D1%8D%D1%8D", "plain"]);
        assert_eq!(
            variants,
            vec![
                "мэдээ".to_string(),
                "%D0%BC%D1%8D%D0%B4%D1%8D%D1%8D".to_string(),
                "plain".to_string(),
            ]
        );
    }

    #[test]
    fn static_variants_fall_back_to_raw_slug_when_decoding_fails() {
        let variants = static_slug_variants(["50%"]);
        assert_eq!(variants, vec!["50%".to_string(), "50%25".to_string()]);
    }
}
