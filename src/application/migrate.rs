//! One-shot move of legacy bare keys into the canonical `post:` namespace.

use serde::Serialize;
use tracing::{info, warn};

use crate::application::content::{ContentError, ContentStore, parse_post, write_post};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    /// `(legacy key, canonical key)` pairs moved, or that would be moved.
    pub moved: Vec<(String, String)>,
    /// Legacy keys left alone because the canonical key already exists.
    pub conflicts: Vec<String>,
    /// Legacy keys whose value does not parse as a post.
    pub invalid: Vec<String>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.invalid.is_empty()
    }
}

impl ContentStore {
    pub async fn migrate_legacy_keys(&self, dry_run: bool) -> Result<MigrationReport, ContentError> {
        let kv = self.writer()?;
        let keys = self.keys();
        let all_keys = kv.list_keys(None).await?;

        let mut report = MigrationReport {
            dry_run,
            ..MigrationReport::default()
        };

        for legacy_key in all_keys.iter().filter(|key| keys.is_legacy_key(key)) {
            let canonical = keys.canonical(legacy_key);
            if all_keys.contains(&canonical) {
                report.conflicts.push(legacy_key.clone());
                continue;
            }

            let Some(raw) = kv.get(legacy_key).await? else {
                continue;
            };
            let mut post = match parse_post(legacy_key, &raw) {
                Ok(post) => post,
                Err(err) => {
                    warn!(
                        target = "medee::application::migrate",
                        key = %legacy_key,
                        error = %err,
                        "skipping legacy key that is not a post"
                    );
                    report.invalid.push(legacy_key.clone());
                    continue;
                }
            };

            if !dry_run {
                post.slug = legacy_key.clone();
                write_post(kv.as_ref(), &canonical, &post).await?;
                kv.delete(legacy_key).await?;
            }
            info!(
                target = "medee::application::migrate",
                from = %legacy_key,
                to = %canonical,
                dry_run,
                "legacy key migrated"
            );
            report.moved.push((legacy_key.clone(), canonical));
        }

        Ok(report)
    }
}
