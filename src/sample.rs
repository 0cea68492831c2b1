//! Sample content synthesis.
//!
//! Blocks have no content of their own, so previewing one means inventing
//! representative markup for it. [`Synthesizer::synthesize`] resolves, in
//! order:
//!
//! 1. the `block_content` hook,
//! 2. the usage example the block type declares,
//! 3. the built-in catalogue below,
//! 4. an attribute-only shell for dynamic blocks,
//! 5. a placeholder paragraph naming the block.
//!
//! A requested variation adds `is-style-{variation}` to every top-level
//! block, both to its `className` attribute and to its first element.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::blocks::{add_class_to_first_element, merge_class_token, serialize_block};
use crate::dynamic::is_dynamic_block;
use crate::hooks::{BlockRef, Hooks};
use crate::host::{BlockExample, ExampleBlock, SiteCatalog};
use crate::render::escape_html;

const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/800x600/cccccc/666666?text=Sample+Image";
const MEDIUM_PARAGRAPH: &str = "This is a medium-length paragraph that demonstrates text wrapping, line height, and overall typography styles applied by the theme. It should contain enough content to span multiple lines on most viewport sizes.";

/// One top-level block of sample content: delimiter attributes plus the
/// saved HTML between the delimiters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleBlock {
    pub attrs: Map<String, Value>,
    pub content: String,
}

impl SampleBlock {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            attrs: Map::new(),
            content: content.into(),
        }
    }

    /// `attrs` must be a JSON object; anything else is ignored.
    pub fn with_attrs(attrs: Value, content: impl Into<String>) -> Self {
        Self {
            attrs: match attrs {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            content: content.into(),
        }
    }

    fn apply_variation(&mut self, variation: &str) {
        let token = format!("is-style-{variation}");
        let existing = self.attrs.get("className").and_then(Value::as_str).unwrap_or("");
        let merged = merge_class_token(existing, &token);
        self.attrs.insert("className".into(), Value::String(merged));
        if !self.content.is_empty() {
            self.content = add_class_to_first_element(&self.content, &token);
        }
    }
}

/// Where a block's sample content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSource {
    Hook,
    Example,
    Catalogue,
    DynamicShell,
    Placeholder,
}

/// Builds sample markup for blocks.
pub struct Synthesizer<'a> {
    catalog: &'a dyn SiteCatalog,
    hooks: &'a Hooks,
}

impl<'a> Synthesizer<'a> {
    pub fn new(catalog: &'a dyn SiteCatalog, hooks: &'a Hooks) -> Self {
        Self { catalog, hooks }
    }

    /// Serialized sample markup for `name`. Never empty.
    pub fn synthesize(&self, name: &str, variation: Option<&str>) -> String {
        let (blocks, _) = self.sample_blocks(name, variation);
        blocks
            .into_iter()
            .map(|mut block| {
                if let Some(v) = variation.filter(|v| !v.is_empty()) {
                    block.apply_variation(v);
                }
                serialize_block(name, &block.attrs, &block.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Unserialized sample blocks and the step that produced them.
    pub fn sample_blocks(&self, name: &str, variation: Option<&str>) -> (Vec<SampleBlock>, SampleSource) {
        let target = BlockRef::new(name, variation);

        if let Some(custom) = self.hooks.block_content.apply(None, &target) {
            if !custom.is_empty() {
                return (custom, SampleSource::Hook);
            }
        }

        if let Some(example) = self.catalog.block_type(name).and_then(|t| t.example) {
            return (vec![from_example(name, &example)], SampleSource::Example);
        }

        if let Some(blocks) = catalogue(name) {
            return (blocks, SampleSource::Catalogue);
        }

        if is_dynamic_block(self.catalog, self.hooks, name) {
            let attrs = self.hooks.block_attributes.apply(Map::new(), &target);
            return (vec![SampleBlock { attrs, content: String::new() }], SampleSource::DynamicShell);
        }

        (
            vec![SampleBlock::new(format!(
                "<p class=\"wp-vrt-placeholder\">Sample content for the {} block.</p>",
                escape_html(name)
            ))],
            SampleSource::Placeholder,
        )
    }
}

fn from_example(name: &str, example: &BlockExample) -> SampleBlock {
    SampleBlock {
        attrs: example.attributes.clone(),
        content: example_html(name, &example.attributes, &example.inner_blocks),
    }
}

/// Saved HTML for an example node: a wrapper carrying its text content and
/// its serialized children.
fn example_html(name: &str, attrs: &Map<String, Value>, inner: &[ExampleBlock]) -> String {
    let short = name.rsplit('/').next().unwrap_or(name);
    let text = attrs.get("content").and_then(Value::as_str).unwrap_or("");
    let children: String = inner
        .iter()
        .map(|child| {
            serialize_block(
                &child.name,
                &child.attributes,
                &example_html(&child.name, &child.attributes, &child.inner_blocks),
            )
        })
        .collect();
    format!("<div class=\"wp-block-{short}\">{text}{children}</div>")
}

/// Hand-authored samples for core blocks.
pub fn catalogue(name: &str) -> Option<Vec<SampleBlock>> {
    let blocks: Vec<SampleBlock> = match name {
        "core/paragraph" => vec![
            SampleBlock::with_attrs(
                json!({"content": "This is a short paragraph."}),
                "<p>This is a short paragraph.</p>",
            ),
            SampleBlock::with_attrs(json!({"content": MEDIUM_PARAGRAPH}), format!("<p>{MEDIUM_PARAGRAPH}</p>")),
            SampleBlock::with_attrs(
                json!({"align": "center"}),
                "<p class=\"has-text-align-center\">This is a centered paragraph.</p>",
            ),
        ],
        "core/heading" => (1..=6)
            .map(|level| {
                SampleBlock::with_attrs(
                    json!({"level": level, "content": format!("Heading Level {level}")}),
                    format!("<h{level} class=\"wp-block-heading\">Heading Level {level}</h{level}>"),
                )
            })
            .collect(),
        "core/list" => vec![
            SampleBlock::with_attrs(
                json!({"ordered": false}),
                "<ul class=\"wp-block-list\"><li>First unordered list item</li><li>Second item with more text</li><li>Third item</li></ul>",
            ),
            SampleBlock::with_attrs(
                json!({"ordered": true}),
                "<ol class=\"wp-block-list\"><li>First ordered list item</li><li>Second item</li><li>Third item</li></ol>",
            ),
        ],
        "core/list-item" => vec![SampleBlock::new("<li>A single list item</li>")],
        "core/quote" => vec![SampleBlock::with_attrs(
            json!({"citation": "Citation Source"}),
            "<blockquote class=\"wp-block-quote\"><p>This is a sample quote demonstrating the blockquote styling.</p><cite>Citation Source</cite></blockquote>",
        )],
        "core/pullquote" => vec![SampleBlock::with_attrs(
            json!({"value": "This is a pull quote example to test styling.", "citation": "Citation Source"}),
            "<figure class=\"wp-block-pullquote\"><blockquote><p>This is a pull quote example to test styling.</p><cite>Citation Source</cite></blockquote></figure>",
        )],
        "core/code" => vec![SampleBlock::new(
            "<pre class=\"wp-block-code\"><code>fn main() {\n    println!(\"Hello, world!\");\n}</code></pre>",
        )],
        "core/preformatted" => vec![SampleBlock::new(
            "<pre class=\"wp-block-preformatted\">Preformatted text keeps\n    its spacing   and\nline breaks.</pre>",
        )],
        "core/verse" => vec![SampleBlock::new(
            "<pre class=\"wp-block-verse\">Roses are placeholder red,\nViolets are placeholder blue.</pre>",
        )],
        "core/details" => vec![SampleBlock::with_attrs(
            json!({"summary": "Show more details"}),
            "<details class=\"wp-block-details\"><summary>Show more details</summary><p>Hidden content revealed on toggle.</p></details>",
        )],
        "core/table" => vec![SampleBlock::new(
            "<figure class=\"wp-block-table\"><table><thead><tr><th>Plan</th><th>Price</th></tr></thead><tbody><tr><td>Basic</td><td>$10</td></tr><tr><td>Pro</td><td>$25</td></tr></tbody></table><figcaption class=\"wp-element-caption\">Sample pricing table</figcaption></figure>",
        )],
        "core/button" => vec![SampleBlock::with_attrs(
            json!({"text": "Default Button"}),
            "<div class=\"wp-block-button\"><a class=\"wp-block-button__link wp-element-button\" href=\"#\">Default Button</a></div>",
        )],
        "core/buttons" => vec![SampleBlock::new(
            "<div class=\"wp-block-buttons\"><div class=\"wp-block-button\"><a class=\"wp-block-button__link wp-element-button\" href=\"#\">Primary</a></div><div class=\"wp-block-button is-style-outline\"><a class=\"wp-block-button__link wp-element-button\" href=\"#\">Outline</a></div></div>",
        )],
        "core/separator" => vec![SampleBlock::new("<hr class=\"wp-block-separator has-alpha-channel-opacity\"/>")],
        "core/spacer" => vec![SampleBlock::with_attrs(
            json!({"height": "48px"}),
            "<div style=\"height:48px\" aria-hidden=\"true\" class=\"wp-block-spacer\"></div>",
        )],
        "core/group" => vec![SampleBlock::new(
            "<div class=\"wp-block-group\"><p>Group block with inner content.</p></div>",
        )],
        "core/columns" => vec![SampleBlock::new(
            "<div class=\"wp-block-columns\"><div class=\"wp-block-column\"><p>Column one content.</p></div><div class=\"wp-block-column\"><p>Column two content.</p></div></div>",
        )],
        "core/column" => vec![SampleBlock::new(
            "<div class=\"wp-block-column\"><p>Standalone column content.</p></div>",
        )],
        "core/row" => vec![SampleBlock::new(
            "<div class=\"wp-block-row\"><div class=\"wp-block-group\"><p>Row item one.</p></div><div class=\"wp-block-group\"><p>Row item two.</p></div></div>",
        )],
        "core/stack" => vec![SampleBlock::new(
            "<div class=\"wp-block-stack\"><div class=\"wp-block-group\"><p>Stack item one.</p></div><div class=\"wp-block-group\"><p>Stack item two.</p></div></div>",
        )],
        "core/image" => vec![SampleBlock::with_attrs(
            json!({"url": PLACEHOLDER_IMAGE, "alt": "Sample image for visual testing"}),
            format!("<figure class=\"wp-block-image\"><img src=\"{PLACEHOLDER_IMAGE}\" alt=\"Sample image for visual testing\"/><figcaption class=\"wp-element-caption\">This is a sample image caption</figcaption></figure>"),
        )],
        "core/gallery" => vec![SampleBlock::new(
            "<figure class=\"wp-block-gallery has-nested-images columns-3\"><figure class=\"wp-block-image\"><img src=\"https://via.placeholder.com/400x300/3498db/ffffff?text=Image+1\" alt=\"Gallery image 1\"/></figure><figure class=\"wp-block-image\"><img src=\"https://via.placeholder.com/400x300/e74c3c/ffffff?text=Image+2\" alt=\"Gallery image 2\"/></figure><figure class=\"wp-block-image\"><img src=\"https://via.placeholder.com/400x300/2ecc71/ffffff?text=Image+3\" alt=\"Gallery image 3\"/></figure></figure>",
        )],
        "core/cover" => vec![SampleBlock::with_attrs(
            json!({"url": "https://via.placeholder.com/1200x600/34495e/ffffff?text=Cover+Background", "dimRatio": 50}),
            "<div class=\"wp-block-cover\"><span aria-hidden=\"true\" class=\"wp-block-cover__background has-background-dim\"></span><img class=\"wp-block-cover__image-background\" alt=\"\" src=\"https://via.placeholder.com/1200x600/34495e/ffffff?text=Cover+Background\" data-object-fit=\"cover\"/><div class=\"wp-block-cover__inner-container\"><h2>Cover Block Title</h2><p>Sample content inside cover block.</p></div></div>",
        )],
        "core/media-text" => vec![SampleBlock::new(format!(
            "<div class=\"wp-block-media-text is-stacked-on-mobile\"><figure class=\"wp-block-media-text__media\"><img src=\"{PLACEHOLDER_IMAGE}\" alt=\"\"/></figure><div class=\"wp-block-media-text__content\"><p>Text placed next to the media.</p></div></div>"
        ))],
        "core/audio" => vec![SampleBlock::with_attrs(
            json!({"src": "https://via.placeholder.com/audio.mp3"}),
            "<figure class=\"wp-block-audio\"><audio controls src=\"https://via.placeholder.com/audio.mp3\"></audio></figure>",
        )],
        "core/video" => vec![SampleBlock::with_attrs(
            json!({"src": "https://via.placeholder.com/video.mp4"}),
            "<figure class=\"wp-block-video\"><video controls src=\"https://via.placeholder.com/video.mp4\"></video></figure>",
        )],
        "core/file" => vec![SampleBlock::with_attrs(
            json!({"href": "https://via.placeholder.com/sample.pdf"}),
            "<div class=\"wp-block-file\"><a href=\"https://via.placeholder.com/sample.pdf\">sample.pdf</a><a href=\"https://via.placeholder.com/sample.pdf\" class=\"wp-block-file__button wp-element-button\" download>Download</a></div>",
        )],
        "core/html" => vec![SampleBlock::new("<div class=\"wp-vrt-custom-html\"><strong>Custom HTML</strong> block content.</div>")],
        "core/social-links" => vec![SampleBlock::new(
            "<ul class=\"wp-block-social-links\"><!-- wp:social-link {\"url\":\"https://wordpress.org\",\"service\":\"wordpress\"} /--><!-- wp:social-link {\"url\":\"https://github.com\",\"service\":\"github\"} /--></ul>",
        )],
        "core/navigation" => vec![SampleBlock::new(
            "<!-- wp:navigation-link {\"label\":\"Home\",\"url\":\"#\"} /--><!-- wp:navigation-link {\"label\":\"About\",\"url\":\"#about\"} /--><!-- wp:navigation-link {\"label\":\"Contact\",\"url\":\"#contact\"} /-->",
        )],
        "core/navigation-link" => vec![SampleBlock::with_attrs(json!({"label": "Sample Link", "url": "#"}), "")],
        "core/query" => vec![SampleBlock::with_attrs(
            json!({"queryId": 1, "query": {"perPage": 3, "postType": "post", "inherit": false}}),
            "<div class=\"wp-block-query\"><!-- wp:post-template --><!-- wp:post-title {\"isLink\":true} /--><!-- wp:post-date /--><!-- wp:post-excerpt /--><!-- /wp:post-template --></div>",
        )],
        "core/post-template" => vec![SampleBlock::new(
            "<!-- wp:post-title /--><!-- wp:post-excerpt /-->",
        )],
        "core/post-title" => vec![SampleBlock::with_attrs(json!({"level": 2}), "")],
        "core/latest-posts" => vec![SampleBlock::with_attrs(json!({"postsToShow": 3, "displayPostDate": true}), "")],
        "core/comments" => vec![SampleBlock::new(
            "<div class=\"wp-block-comments\"><!-- wp:comments-title /--><!-- wp:comment-template /--></div>",
        )],
        "core/search" => vec![SampleBlock::with_attrs(
            json!({"label": "Search", "buttonText": "Search", "showLabel": true}),
            "",
        )],
        _ => return None,
    };
    Some(blocks)
}
