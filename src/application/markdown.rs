use std::sync::OnceLock;

use comrak::{markdown_to_html, options::Options};

static OPTIONS: OnceLock<Options<'static>> = OnceLock::new();

fn options() -> &'static Options<'static> {
    OPTIONS.get_or_init(|| {
        let mut options = Options::default();
        let ext = &mut options.extension;
        ext.strikethrough = true;
        ext.tagfilter = true;
        ext.table = true;
        ext.autolink = true;
        ext.tasklist = true;

        let render = &mut options.render;
        render.github_pre_lang = true;
        render.tasklist_classes = true;
        render.r#unsafe = false;
        options
    })
}

/// Render post markdown to HTML. Raw HTML in the source is dropped.
pub fn render_markdown(source: &str) -> String {
    markdown_to_html(source, options())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_gfm_tables_and_strikethrough() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn raw_html_is_not_passed_through() {
        let html = render_markdown("<script>alert(1)</script>\n\ntext");
        assert!(!html.contains("<script>"));
        assert!(html.contains("<p>text</p>"));
    }

    #[test]
    fn autolinks_bare_urls() {
        let html = render_markdown("see https://example.com");
        assert!(html.contains("<a href=\"https://example.com\">"));
    }
}
