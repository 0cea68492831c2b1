//! Fixture-backed host.
//!
//! [`MemorySite`] answers every catalog-side host question from a
//! [`SiteFixture`] (normally a JSON file): registered block types (the core
//! set is included unless `skip_core_blocks` is set), patterns, templates,
//! stored items, the active theme and head/footer output. It also expands
//! block markup, rendering a handful of live-data blocks against the
//! ambient item.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::{
    BlockExpander, BlockStyle, BlockType, ContentStore, Item, ItemOrder, ItemQuery, ItemStatus,
    NewItem, PageLifecycle, PatternDef, SiteCatalog, TemplateDef, TemplateKind, ThemeSource,
};
use crate::blocks::{merge_class_token, parse_blocks, Block, Chunk};
use crate::dynamic::RenderContext;
use crate::render::{escape_attr, escape_html};
use crate::{Error, Result};

/// Deepest block nesting [`MemorySite`] expands before giving up.
pub const MAX_EXPANSION_DEPTH: usize = 32;

/// Theme section of a fixture.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeFixture {
    /// theme.json-shaped design configuration
    pub design: Option<Value>,
    /// Directory holding the theme's `style.css`
    pub stylesheet_dir: Option<PathBuf>,
    pub block_library_css: String,
}

/// Everything a [`MemorySite`] serves.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteFixture {
    pub skip_core_blocks: bool,
    pub block_types: Vec<BlockType>,
    pub patterns: Vec<PatternDef>,
    pub pattern_categories: BTreeMap<String, String>,
    pub templates: Vec<TemplateDef>,
    pub template_parts: Vec<TemplateDef>,
    pub item_types: Vec<String>,
    pub items: Vec<Item>,
    pub theme: ThemeFixture,
    pub site_name: Option<String>,
    pub head_html: String,
    pub footer_html: String,
    pub language: Option<String>,
    pub charset: Option<String>,
    pub scenarios: Vec<FixtureScenario>,
}

/// A static scenario declared in a fixture.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixtureScenario {
    pub slug: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
}

impl SiteFixture {
    /// Read a fixture from a JSON file. Relative `stylesheet_dir` values are
    /// resolved against the fixture's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut fixture: SiteFixture = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        if let (Some(dir), Some(base)) = (fixture.theme.stylesheet_dir.as_mut(), path.parent()) {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        Ok(fixture)
    }
}

/// In-memory host site.
#[derive(Debug)]
pub struct MemorySite {
    block_types: Vec<BlockType>,
    patterns: Vec<PatternDef>,
    pattern_categories: BTreeMap<String, String>,
    templates: Vec<TemplateDef>,
    template_parts: Vec<TemplateDef>,
    item_types: Vec<String>,
    items: RwLock<Vec<Item>>,
    next_id: AtomicU64,
    theme: ThemeFixture,
    site_name: String,
    head_html: String,
    footer_html: String,
    language: String,
    charset: String,
    scenarios: Vec<FixtureScenario>,
}

impl MemorySite {
    pub fn from_fixture(fixture: SiteFixture) -> Self {
        let mut block_types = if fixture.skip_core_blocks { Vec::new() } else { core_block_types() };
        for bt in fixture.block_types {
            match block_types.iter_mut().find(|b| b.name == bt.name) {
                Some(existing) => *existing = bt,
                None => block_types.push(bt),
            }
        }

        let mut item_types = vec!["post".to_string(), "page".to_string(), "wp_block".to_string()];
        for t in fixture.item_types {
            if !item_types.contains(&t) {
                item_types.push(t);
            }
        }
        let next_id = fixture.items.iter().map(|i| i.id).max().unwrap_or(0) + 1;

        Self {
            block_types,
            patterns: fixture.patterns,
            pattern_categories: fixture.pattern_categories,
            templates: fixture.templates,
            template_parts: fixture.template_parts,
            item_types,
            items: RwLock::new(fixture.items),
            next_id: AtomicU64::new(next_id),
            theme: fixture.theme,
            site_name: fixture.site_name.unwrap_or_else(|| "WP VRT".to_string()),
            head_html: fixture.head_html,
            footer_html: fixture.footer_html,
            language: fixture.language.unwrap_or_else(|| "en-US".to_string()),
            charset: fixture.charset.unwrap_or_else(|| "UTF-8".to_string()),
            scenarios: fixture.scenarios,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_fixture(SiteFixture::load(path)?))
    }

    /// Static scenarios declared by the fixture.
    pub fn fixture_scenarios(&self) -> &[FixtureScenario] {
        &self.scenarios
    }

    fn render_blocks(&self, blocks: &[Block], current: Option<&Item>, depth: usize, out: &mut String) -> Result<()> {
        for block in blocks {
            self.render_block(block, current, depth, out)?;
        }
        Ok(())
    }

    fn render_block(&self, block: &Block, current: Option<&Item>, depth: usize, out: &mut String) -> Result<()> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(Error::Render(format!(
                "block nesting deeper than {MAX_EXPANSION_DEPTH} levels"
            )));
        }
        let Some(name) = block.name.as_deref() else {
            out.push_str(&block.inner_html);
            return Ok(());
        };
        let dynamic = self.block_type(name).is_some_and(|t| t.dynamic);
        if dynamic {
            self.render_dynamic(name, block, current, depth, out)
        } else {
            self.render_saved(block, current, depth, out)
        }
    }

    /// Saved HTML with inner blocks expanded in place.
    fn render_saved(&self, block: &Block, current: Option<&Item>, depth: usize, out: &mut String) -> Result<()> {
        let mut inner = block.inner_blocks.iter();
        for chunk in &block.inner_content {
            match chunk {
                Chunk::Html(html) => out.push_str(html),
                Chunk::Inner => {
                    if let Some(child) = inner.next() {
                        self.render_block(child, current, depth + 1, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn render_dynamic(&self, name: &str, block: &Block, current: Option<&Item>, depth: usize, out: &mut String) -> Result<()> {
        let short = name.rsplit('/').next().unwrap_or(name);
        match name {
            "core/post-title" => {
                if let Some(item) = current {
                    let level = block.attrs.get("level").and_then(Value::as_u64).unwrap_or(2).clamp(1, 6);
                    let _ = write!(
                        out,
                        "<h{level} class=\"wp-block-post-title\">{}</h{level}>",
                        escape_html(&item.title)
                    );
                }
            }
            "core/post-content" => {
                if let Some(item) = current {
                    out.push_str("<div class=\"entry-content wp-block-post-content\">");
                    self.render_blocks(&parse_blocks(&item.content), current, depth + 1, out)?;
                    out.push_str("</div>");
                }
            }
            "core/post-excerpt" => {
                if let Some(item) = current {
                    let text = strip_tags(&item.content);
                    let excerpt: Vec<&str> = text.split_whitespace().take(55).collect();
                    let _ = write!(
                        out,
                        "<div class=\"wp-block-post-excerpt\"><p class=\"wp-block-post-excerpt__excerpt\">{}</p></div>",
                        escape_html(&excerpt.join(" "))
                    );
                }
            }
            "core/post-date" => {
                if let Some(item) = current {
                    let date = item.published_at.unwrap_or_else(Utc::now);
                    let _ = write!(
                        out,
                        "<div class=\"wp-block-post-date\"><time datetime=\"{}\">{}</time></div>",
                        escape_attr(&date.to_rfc3339()),
                        date.format("%B %-d, %Y")
                    );
                }
            }
            "core/latest-posts" => {
                let count = block.attrs.get("postsToShow").and_then(Value::as_u64).unwrap_or(5) as usize;
                out.push_str("<ul class=\"wp-block-latest-posts__list wp-block-latest-posts\">");
                for item in self.published(count) {
                    let _ = write!(
                        out,
                        "<li><a class=\"wp-block-latest-posts__post-title\" href=\"#\">{}</a></li>",
                        escape_html(&item.title)
                    );
                }
                out.push_str("</ul>");
            }
            "core/post-template" => {
                let mut loop_items = self.published(3);
                if loop_items.is_empty() {
                    loop_items.extend(current.cloned());
                }
                out.push_str("<ul class=\"wp-block-post-template\">");
                for item in &loop_items {
                    out.push_str("<li class=\"wp-block-post\">");
                    self.render_blocks(&block.inner_blocks, Some(item), depth + 1, out)?;
                    out.push_str("</li>");
                }
                out.push_str("</ul>");
            }
            "core/navigation" => {
                let _ = write!(
                    out,
                    "<nav class=\"{}\"><ul class=\"wp-block-navigation__container\">",
                    block_classes(short, block)
                );
                self.render_saved(block, current, depth, out)?;
                out.push_str("</ul></nav>");
            }
            "core/navigation-link" => {
                let label = block.attrs.get("label").and_then(Value::as_str).unwrap_or("");
                let url = block.attrs.get("url").and_then(Value::as_str).unwrap_or("#");
                let _ = write!(
                    out,
                    "<li class=\"wp-block-navigation-item\"><a class=\"wp-block-navigation-item__content\" href=\"{}\">{}</a></li>",
                    escape_attr(url),
                    escape_html(label)
                );
            }
            "core/site-title" => {
                let _ = write!(
                    out,
                    "<p class=\"{}\"><a href=\"#\">{}</a></p>",
                    block_classes(short, block),
                    escape_html(&self.site_name)
                );
            }
            _ if block.inner_html.trim().is_empty() && block.inner_blocks.is_empty() => {
                let _ = write!(out, "<div class=\"{}\"></div>", block_classes(short, block));
            }
            _ => self.render_saved(block, current, depth, out)?,
        }
        Ok(())
    }

    fn published(&self, limit: usize) -> Vec<Item> {
        self.query(&ItemQuery {
            item_types: vec!["post".to_string()],
            statuses: vec![ItemStatus::Publish],
            order: ItemOrder::NewestFirst,
            limit: Some(limit),
        })
    }
}

/// `wp-block-{short}` plus any `className` attribute, escaped for an attribute.
fn block_classes(short: &str, block: &Block) -> String {
    let base = format!("wp-block-{short}");
    let classes = match block.attrs.get("className").and_then(Value::as_str) {
        Some(extra) => extra
            .split_whitespace()
            .fold(base, |acc, token| merge_class_token(&acc, token)),
        None => base,
    };
    escape_attr(&classes)
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

impl SiteCatalog for MemorySite {
    fn block_types(&self) -> Vec<BlockType> {
        self.block_types.clone()
    }

    fn block_type(&self, name: &str) -> Option<BlockType> {
        self.block_types.iter().find(|b| b.name == name).cloned()
    }

    fn patterns(&self) -> Vec<PatternDef> {
        self.patterns.clone()
    }

    fn pattern_category_label(&self, slug: &str) -> Option<String> {
        self.pattern_categories.get(slug).cloned()
    }

    fn templates(&self, kind: TemplateKind) -> Vec<TemplateDef> {
        match kind {
            TemplateKind::Template => self.templates.clone(),
            TemplateKind::TemplatePart => self.template_parts.clone(),
        }
    }

    fn language(&self) -> String {
        self.language.clone()
    }

    fn charset(&self) -> String {
        self.charset.clone()
    }
}

impl ContentStore for MemorySite {
    fn item_type_exists(&self, item_type: &str) -> bool {
        self.item_types.iter().any(|t| t == item_type)
    }

    fn query(&self, query: &ItemQuery) -> Vec<Item> {
        let Ok(items) = self.items.read() else {
            return Vec::new();
        };
        let mut found: Vec<Item> = items
            .iter()
            .filter(|i| query.item_types.is_empty() || query.item_types.contains(&i.item_type))
            .filter(|i| query.statuses.is_empty() || query.statuses.contains(&i.status))
            .cloned()
            .collect();
        match query.order {
            ItemOrder::TitleAsc => found.sort_by_key(|i| i.title.to_lowercase()),
            ItemOrder::NewestFirst => {
                found.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)))
            }
        }
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        found
    }

    fn get(&self, id: u64) -> Option<Item> {
        self.items.read().ok()?.iter().find(|i| i.id == id).cloned()
    }

    fn insert(&self, item: NewItem) -> Result<u64> {
        if !self.item_type_exists(&item.item_type) {
            return Err(Error::Store(format!("unknown item type {}", item.item_type)));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let slug = item
            .title
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        let published_at = (item.status == ItemStatus::Publish).then(Utc::now);
        let mut items = self
            .items
            .write()
            .map_err(|_| Error::Store("item store lock poisoned".into()))?;
        items.push(Item {
            id,
            item_type: item.item_type,
            slug,
            title: item.title,
            content: item.content,
            status: item.status,
            categories: Vec::new(),
            published_at,
        });
        Ok(id)
    }

    fn delete(&self, id: u64) -> Result<()> {
        let mut items = self
            .items
            .write()
            .map_err(|_| Error::Store("item store lock poisoned".into()))?;
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Err(Error::Store(format!("no item with id {id}")));
        }
        Ok(())
    }
}

impl ThemeSource for MemorySite {
    fn design_config(&self) -> Option<Value> {
        self.theme.design.clone()
    }

    fn stylesheet_path(&self) -> Option<PathBuf> {
        self.theme.stylesheet_dir.as_ref().map(|d| d.join("style.css"))
    }

    fn block_library_css(&self) -> String {
        self.theme.block_library_css.clone()
    }
}

impl BlockExpander for MemorySite {
    fn expand(&self, markup: &str, ctx: &RenderContext) -> Result<String> {
        let mut out = String::with_capacity(markup.len());
        self.render_blocks(&parse_blocks(markup), ctx.current_item(), 0, &mut out)?;
        Ok(out)
    }
}

impl PageLifecycle for MemorySite {
    fn head(&self, _ctx: &RenderContext) -> String {
        self.head_html.clone()
    }

    fn footer(&self, _ctx: &RenderContext) -> String {
        self.footer_html.clone()
    }
}

/// The built-in block types every site registers.
pub fn core_block_types() -> Vec<BlockType> {
    // (name, title, dynamic, parents)
    const CORE: &[(&str, &str, bool, &[&str])] = &[
        ("core/paragraph", "Paragraph", false, &[]),
        ("core/heading", "Heading", false, &[]),
        ("core/list", "List", false, &[]),
        ("core/list-item", "List item", false, &["core/list"]),
        ("core/quote", "Quote", false, &[]),
        ("core/pullquote", "Pullquote", false, &[]),
        ("core/code", "Code", false, &[]),
        ("core/preformatted", "Preformatted", false, &[]),
        ("core/verse", "Verse", false, &[]),
        ("core/details", "Details", false, &[]),
        ("core/table", "Table", false, &[]),
        ("core/image", "Image", false, &[]),
        ("core/gallery", "Gallery", false, &[]),
        ("core/cover", "Cover", false, &[]),
        ("core/audio", "Audio", false, &[]),
        ("core/video", "Video", false, &[]),
        ("core/file", "File", false, &[]),
        ("core/media-text", "Media & Text", false, &[]),
        ("core/embed", "Embed", false, &[]),
        ("core/buttons", "Buttons", false, &[]),
        ("core/button", "Button", false, &["core/buttons"]),
        ("core/separator", "Separator", false, &[]),
        ("core/spacer", "Spacer", false, &[]),
        ("core/group", "Group", false, &[]),
        ("core/columns", "Columns", false, &[]),
        ("core/column", "Column", false, &["core/columns"]),
        ("core/more", "More", false, &[]),
        ("core/nextpage", "Page Break", false, &[]),
        ("core/html", "Custom HTML", false, &[]),
        ("core/shortcode", "Shortcode", true, &[]),
        ("core/archives", "Archives", true, &[]),
        ("core/calendar", "Calendar", true, &[]),
        ("core/categories", "Terms List", true, &[]),
        ("core/latest-comments", "Latest Comments", true, &[]),
        ("core/latest-posts", "Latest Posts", true, &[]),
        ("core/page-list", "Page List", true, &[]),
        ("core/rss", "RSS", true, &[]),
        ("core/search", "Search", true, &[]),
        ("core/tag-cloud", "Tag Cloud", true, &[]),
        ("core/social-links", "Social Icons", false, &[]),
        ("core/social-link", "Social Icon", true, &["core/social-links"]),
        ("core/navigation", "Navigation", true, &[]),
        ("core/navigation-link", "Custom Link", true, &["core/navigation"]),
        ("core/navigation-submenu", "Submenu", true, &["core/navigation"]),
        ("core/site-logo", "Site Logo", true, &[]),
        ("core/site-title", "Site Title", true, &[]),
        ("core/site-tagline", "Site Tagline", true, &[]),
        ("core/query", "Query Loop", true, &[]),
        ("core/post-template", "Post Template", true, &["core/query"]),
        ("core/query-pagination", "Pagination", true, &["core/query"]),
        ("core/query-no-results", "No Results", true, &["core/query"]),
        ("core/post-title", "Title", true, &[]),
        ("core/post-content", "Content", true, &[]),
        ("core/post-excerpt", "Excerpt", true, &[]),
        ("core/post-date", "Date", true, &[]),
        ("core/post-author", "Author", true, &[]),
        ("core/post-featured-image", "Featured Image", true, &[]),
        ("core/post-terms", "Post Terms", true, &[]),
        ("core/comments", "Comments", true, &[]),
        ("core/comment-template", "Comment Template", true, &["core/comments"]),
        ("core/comments-title", "Comments Title", true, &[]),
        ("core/loginout", "Login/out", true, &[]),
        ("core/template-part", "Template Part", true, &[]),
        ("core/pattern", "Pattern", true, &[]),
        ("core/widget-group", "Widget Group", false, &[]),
    ];

    CORE.iter()
        .map(|(name, title, dynamic, parent)| BlockType {
            name: name.to_string(),
            title: Some(title.to_string()),
            parent: parent.iter().map(|p| p.to_string()).collect(),
            styles: core_styles(name),
            dynamic: *dynamic,
            ..Default::default()
        })
        .collect()
}

fn core_styles(name: &str) -> Vec<BlockStyle> {
    match name {
        "core/button" => vec![BlockStyle::new("fill", "Fill"), BlockStyle::new("outline", "Outline")],
        "core/image" | "core/site-logo" => {
            vec![BlockStyle::new("default", "Default"), BlockStyle::new("rounded", "Rounded")]
        }
        "core/quote" => vec![BlockStyle::new("default", "Default"), BlockStyle::new("plain", "Plain")],
        "core/separator" => vec![
            BlockStyle::new("default", "Default"),
            BlockStyle::new("wide", "Wide Line"),
            BlockStyle::new("dots", "Dots"),
        ],
        "core/table" => vec![BlockStyle::new("regular", "Default"), BlockStyle::new("stripes", "Stripes")],
        "core/social-links" => vec![
            BlockStyle::new("default", "Default"),
            BlockStyle::new("logos-only", "Logos Only"),
            BlockStyle::new("pill-shape", "Pill Shape"),
        ],
        _ => Vec::new(),
    }
}
