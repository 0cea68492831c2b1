//! Page rendering.
//!
//! [`Renderer::render`] turns one unit's markup into a self-contained HTML
//! document: dynamic context (when the markup needs one), layered styles,
//! expanded body, captured head and footer output, then the `html_output`
//! hook. The dynamic context is torn down on every path out, including an
//! expansion failure.

use std::fmt::Write;

use log::debug;

use crate::dynamic::{requires_context, DynamicContext, RenderContext};
use crate::hooks::PageRef;
use crate::registry::UnitKind;
use crate::styles::StyleCollector;
use crate::{Result, Vrt};

/// Escape text for HTML element content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape text for a double-quoted attribute value.
pub fn escape_attr(text: &str) -> String {
    escape_html(text)
}

/// Strip everything but `[A-Za-z0-9_-]` from a class token.
pub fn sanitize_html_class(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Assembles preview documents.
pub struct Renderer<'a> {
    vrt: &'a Vrt,
}

impl<'a> Renderer<'a> {
    pub fn new(vrt: &'a Vrt) -> Self {
        Self { vrt }
    }

    /// Render `markup` as the preview page of `kind`/`slug`.
    ///
    /// Not safe to retry blindly: a render pushes ambient state onto `ctx`
    /// and may create and delete a temporary content item.
    pub fn render(
        &self,
        ctx: &mut RenderContext,
        kind: UnitKind,
        slug: &str,
        variation: Option<&str>,
        markup: &str,
    ) -> Result<String> {
        let host = &self.vrt.host;
        let hooks = &self.vrt.hooks;
        let needs_context = requires_context(host.catalog.as_ref(), hooks, markup);
        debug!(
            "rendering {kind}/{slug}: {} bytes of markup, dynamic context {}",
            markup.len(),
            if needs_context { "required" } else { "not required" }
        );

        let dynamic = DynamicContext::new(
            host.content.as_ref(),
            hooks,
            self.vrt.config.dynamic_item_id,
            self.vrt.config.fallback_item.clone(),
        );
        let scope = dynamic.enter(ctx, needs_context);

        let styles = StyleCollector::new(host.theme.as_ref(), host.catalog.as_ref(), hooks).collect();
        let body = host.expander.expand(markup, &scope)?;
        let head = host.lifecycle.head(&scope);
        let footer = host.lifecycle.footer(&scope);
        drop(scope);

        let language = host.catalog.language();
        let charset = host.catalog.charset();
        let title = format!("WP VRT: {kind} - {slug}");

        let mut html = String::with_capacity(body.len() + 2048);
        html.push_str("<!DOCTYPE html>\n");
        let _ = writeln!(html, "<html lang=\"{}\" class=\"wp-vrt-html\">\n<head>", escape_attr(&language));
        let _ = writeln!(html, "<meta charset=\"{}\">", escape_attr(&charset));
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
        let _ = writeln!(html, "<title>{}</title>", escape_html(&title));
        let _ = writeln!(html, "<meta name=\"wp-vrt-type\" content=\"{}\">", escape_attr(kind.as_str()));
        let _ = writeln!(html, "<meta name=\"wp-vrt-slug\" content=\"{}\">", escape_attr(slug));
        if let Some(variation) = variation.filter(|v| !v.is_empty()) {
            let _ = writeln!(html, "<meta name=\"wp-vrt-variation\" content=\"{}\">", escape_attr(variation));
        }
        for block in styles.blocks() {
            let _ = writeln!(html, "<style id=\"wp-vrt-{}\">\n{}\n</style>", block.layer.id(), block.css);
        }
        if !head.is_empty() {
            html.push_str(&head);
            html.push('\n');
        }
        html.push_str("</head>\n");

        let body_class = format!("wp-vrt-body wp-vrt-{}", sanitize_html_class(kind.as_str()));
        let _ = writeln!(
            html,
            "<body class=\"{}\" data-wp-vrt-slug=\"{}\">\n<div class=\"wp-site-blocks\">",
            escape_attr(&body_class),
            escape_attr(slug)
        );
        html.push_str(&body);
        html.push_str("\n</div>\n");
        if !footer.is_empty() {
            html.push_str(&footer);
            html.push('\n');
        }
        html.push_str("</body>\n</html>");

        let page = PageRef {
            kind,
            slug: slug.to_string(),
            variation: variation.map(str::to_string),
        };
        Ok(hooks.html_output.apply(html, &page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ContentStore, ItemQuery, SiteFixture};
    use crate::test_support::{vrt_with, vrt_with_hooks};
    use crate::hooks::Hooks;
    use crate::Error;

    #[test]
    fn assembles_document_skeleton() {
        let vrt = vrt_with(SiteFixture {
            head_html: "<script id=\"head-hook\"></script>".into(),
            footer_html: "<script id=\"footer-hook\"></script>".into(),
            theme: crate::host::memory::ThemeFixture {
                block_library_css: ".wp-block-quote{margin:0}".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        let mut ctx = RenderContext::new();
        let html = Renderer::new(&vrt)
            .render(&mut ctx, UnitKind::Block, "core-quote", Some("plain"), "<p>x</p>")
            .unwrap();
        assert!(html.starts_with(concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"en-US\" class=\"wp-vrt-html\">\n<head>\n",
            "<meta charset=\"UTF-8\">\n",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
            "<title>WP VRT: block - core-quote</title>\n",
            "<meta name=\"wp-vrt-type\" content=\"block\">\n",
            "<meta name=\"wp-vrt-slug\" content=\"core-quote\">\n",
            "<meta name=\"wp-vrt-variation\" content=\"plain\">\n",
        )));
        assert!(html.contains("<style id=\"wp-vrt-block-library\">\n.wp-block-quote{margin:0}\n</style>"));
        assert!(!html.contains("wp-vrt-theme-stylesheet"));
        assert!(html.contains(
            "<body class=\"wp-vrt-body wp-vrt-block\" data-wp-vrt-slug=\"core-quote\">\n<div class=\"wp-site-blocks\">\n<p>x</p>\n</div>\n"
        ));
        let head_at = html.find("head-hook").unwrap();
        assert!(head_at < html.find("</head>").unwrap());
        assert!(html.find("footer-hook").unwrap() > html.find("<p>x</p>").unwrap());
        assert!(html.ends_with("</body>\n</html>"));
    }

    #[test]
    fn dynamic_markup_renders_against_temporary_item() {
        let vrt = vrt_with(SiteFixture::default());
        let mut ctx = RenderContext::new();
        let html = Renderer::new(&vrt)
            .render(&mut ctx, UnitKind::Pattern, "p", None, "<!-- wp:post-title /-->")
            .unwrap();
        assert!(html.contains("<h2 class=\"wp-block-post-title\">WP VRT Sample Post</h2>"));
        assert!(!html.contains("wp-vrt-variation"));
        assert_eq!(ctx.depth(), 0);
        assert!(vrt.host.content.query(&ItemQuery::default()).is_empty());
    }

    #[test]
    fn failed_expansion_still_tears_down() {
        let vrt = vrt_with(SiteFixture::default());
        let mut ctx = RenderContext::new();
        let markup = "<!-- wp:post-title /-->".to_string() + &"<!-- wp:group -->".repeat(40);
        let err = Renderer::new(&vrt)
            .render(&mut ctx, UnitKind::Scenario, "deep", None, &markup)
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
        assert_eq!(ctx.depth(), 0);
        assert!(vrt.host.content.query(&ItemQuery::default()).is_empty());
    }

    #[test]
    fn html_output_hook_sees_page() {
        let mut hooks = Hooks::new();
        hooks
            .html_output
            .add(|html, page: &PageRef| format!("{html}<!-- {}:{} -->", page.kind, page.slug));
        let vrt = vrt_with_hooks(SiteFixture::default(), hooks);
        let mut ctx = RenderContext::new();
        let html = Renderer::new(&vrt)
            .render(&mut ctx, UnitKind::Template, "index", None, "")
            .unwrap();
        assert!(html.ends_with("</html><!-- template:index -->"));
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#039;&amp;&#039;&lt;/a&gt;");
        assert_eq!(sanitize_html_class("template part!"), "templatepart");
    }
}
