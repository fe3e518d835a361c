//! Mapping between slugs and key-value storage keys.
//!
//! The canonical shape is `<prefix><slug>` (`post:<slug>` by default). Older
//! data was written under the bare slug; while `legacy_fallback` is on, reads
//! probe that shape too and deletes clear it.

use crate::domain::error::DomainError;

pub const DEFAULT_POST_KEY_PREFIX: &str = "post:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    prefix: String,
    legacy_fallback: bool,
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self::new(DEFAULT_POST_KEY_PREFIX, true)
    }
}

impl KeyScheme {
    pub fn new(prefix: impl Into<String>, legacy_fallback: bool) -> Self {
        Self {
            prefix: prefix.into(),
            legacy_fallback,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn canonical(&self, slug: &str) -> String {
        format!("{}{slug}", self.prefix)
    }

    /// A slug that starts with the prefix would alias another post's
    /// canonical key through the legacy shape.
    pub fn validate_slug(&self, slug: &str) -> Result<(), DomainError> {
        if !self.prefix.is_empty() && slug.starts_with(self.prefix.as_str()) {
            return Err(DomainError::validation(format!(
                "slug must not start with `{}`",
                self.prefix
            )));
        }
        Ok(())
    }

    /// The bare legacy key, when fallback is enabled and the bare slug is
    /// not itself shaped like a canonical key.
    pub fn legacy(&self, slug: &str) -> Option<String> {
        (self.legacy_fallback && self.is_legacy_key(slug)).then(|| slug.to_string())
    }

    /// Keys to probe on read, canonical first.
    pub fn read_candidates(&self, slug: &str) -> Vec<String> {
        let mut keys = vec![self.canonical(slug)];
        keys.extend(self.legacy(slug));
        keys
    }

    pub fn slug_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())
    }

    /// A key written under the pre-namespace scheme.
    pub fn is_legacy_key(&self, key: &str) -> bool {
        !self.prefix.is_empty() && !key.starts_with(self.prefix.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_candidates_probe_canonical_then_bare() {
        let scheme = KeyScheme::default();
        assert_eq!(
            scheme.read_candidates("a"),
            vec!["post:a".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn disabled_fallback_only_probes_canonical() {
        let scheme = KeyScheme::new("post:", false);
        assert_eq!(scheme.read_candidates("a"), vec!["post:a".to_string()]);
        assert_eq!(scheme.legacy("a"), None);
    }

    #[test]
    fn classifies_keys() {
        let scheme = KeyScheme::default();
        assert_eq!(scheme.slug_from_key("post:мэдээ"), Some("мэдээ"));
        assert_eq!(scheme.slug_from_key("мэдээ"), None);
        assert!(scheme.is_legacy_key("мэдээ"));
        assert!(!scheme.is_legacy_key("post:мэдээ"));
    }

    #[test]
    fn prefixed_slugs_never_alias_canonical_keys() {
        let scheme = KeyScheme::default();
        assert!(scheme.validate_slug("post:b").is_err());
        assert!(scheme.validate_slug("posted").is_ok());
        assert_eq!(scheme.legacy("post:b"), None);
        assert_eq!(scheme.read_candidates("post:b"), vec!["post:post:b".to_string()]);
    }
}
