//! Static export of the public site to a directory tree.
//!
//! Every page is written as `<path>/index.html` so the output can be served
//! by any static host with trailing-slash URLs.

use std::path::PathBuf;

use askama::Template;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::application::assets::AssetUrls;
use crate::application::catalog::{CatalogService, RenderContext};
use crate::application::content::ContentError;
use crate::domain::categories::LABELS;
use crate::domain::slug::encode_component;
use crate::infra::error::InfraError;
use crate::presentation::pages::{ListingPage, PostPage, listing_page, post_page};
use crate::presentation::views::{ErrorPageView, ErrorTemplate, SiteChrome};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Site-relative paths of the written files, in write order.
    pub files: Vec<String>,
    /// Slug variants that could not be used as a directory name.
    pub skipped: Vec<String>,
}

pub struct SiteExporter<'a> {
    catalog: &'a CatalogService,
    urls: &'a AssetUrls,
    out_dir: PathBuf,
}

impl<'a> SiteExporter<'a> {
    pub fn new(catalog: &'a CatalogService, urls: &'a AssetUrls, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            urls,
            out_dir: out_dir.into(),
        }
    }

    /// Render every page with a single [`RenderContext`], so the collection
    /// is read from the store once.
    pub async fn export(&self) -> Result<ExportReport, ExportError> {
        let ctx = RenderContext::new();
        // Fail the run outright if the collection cannot be read, instead of
        // writing degraded listings.
        self.catalog.posts(&ctx).await?;

        let mut report = ExportReport::default();

        let listings = [
            ("", ListingPage::home(None)),
            ("niitlel", ListingPage::Articles),
            ("sain-medee", ListingPage::Gospel),
        ];
        for (dir, page) in listings {
            let template = listing_page(self.catalog, &ctx, self.urls, &page).await;
            self.write_page(&mut report, dir, template).await?;
        }

        for label in LABELS {
            let page = ListingPage::Category(label.to_string());
            let template = listing_page(self.catalog, &ctx, self.urls, &page).await;
            let dir = format!("category/{}", encode_component(label));
            self.write_page(&mut report, &dir, template).await?;
        }

        for variant in self.catalog.static_paths(&ctx).await? {
            if !is_safe_segment(&variant) {
                warn!(
                    target = "medee::infra::export",
                    slug = %variant,
                    "skipping slug that cannot be used as a directory name"
                );
                report.skipped.push(variant);
                continue;
            }

            match post_page(self.catalog, &ctx, self.urls, &variant).await {
                PostPage::Found(template) => {
                    let dir = format!("post/{variant}");
                    self.write_page(&mut report, &dir, *template).await?;
                }
                PostPage::NotFound => {
                    warn!(
                        target = "medee::infra::export",
                        slug = %variant,
                        "enumerated slug did not resolve to a post"
                    );
                    report.skipped.push(variant);
                }
                PostPage::Failed(err) => return Err(err.into()),
            }
        }

        let not_found = ErrorTemplate {
            chrome: SiteChrome::new(None),
            view: ErrorPageView::not_found(),
        };
        let html = not_found
            .render()
            .map_err(|err| InfraError::render("404.html", err.to_string()))?;
        self.write_file(&mut report, "404.html", html).await?;

        info!(
            target = "medee::infra::export",
            out_dir = %self.out_dir.display(),
            files = report.files.len(),
            skipped = report.skipped.len(),
            "static export finished"
        );

        Ok(report)
    }

    async fn write_page<T: Template>(
        &self,
        report: &mut ExportReport,
        dir: &str,
        template: T,
    ) -> Result<(), ExportError> {
        let relative = if dir.is_empty() {
            "index.html".to_string()
        } else {
            format!("{dir}/index.html")
        };
        let html = template
            .render()
            .map_err(|err| InfraError::render(relative.clone(), err.to_string()))?;
        self.write_file(report, &relative, html).await
    }

    async fn write_file(
        &self,
        report: &mut ExportReport,
        relative: &str,
        contents: String,
    ) -> Result<(), ExportError> {
        let path = self.out_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }
        fs::write(&path, contents).await.map_err(InfraError::from)?;
        report.files.push(relative.to_string());
        Ok(())
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_separators_are_not_safe_segments() {
        assert!(is_safe_segment("advent-2024"));
        assert!(is_safe_segment("%D0%B0"));
        assert!(!is_safe_segment("a/b"));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment(""));
    }
}
