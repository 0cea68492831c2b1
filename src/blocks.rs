//! Block markup grammar.
//!
//! Content units are stored as HTML interleaved with block delimiters:
//!
//! ```text
//! <!-- wp:group {"layout":{"type":"constrained"}} -->
//! <div class="wp-block-group"><!-- wp:paragraph --><p>Hi</p><!-- /wp:paragraph --></div>
//! <!-- /wp:group -->
//! <!-- wp:spacer {"height":"48px"} /-->
//! ```
//!
//! [`parse_blocks`] turns such a document into a block tree (the same shape
//! the host's own parser produces), [`serialize_block`] writes one block
//! back out.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Namespace assumed for delimiters without one (`wp:paragraph`).
pub const DEFAULT_NAMESPACE: &str = "core/";

/// A piece of a block's inner content, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Literal HTML owned by the block itself
    Html(String),
    /// Placeholder for the next entry of `inner_blocks`
    Inner,
}

/// One node of the parsed block tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// Fully namespaced name, `None` for freeform HTML between blocks
    pub name: Option<String>,
    pub attrs: Map<String, Value>,
    pub inner_blocks: Vec<Block>,
    /// HTML of this block without its inner blocks
    pub inner_html: String,
    pub inner_content: Vec<Chunk>,
}

impl Block {
    fn named(name: String, attrs: Map<String, Value>) -> Self {
        Self {
            name: Some(name),
            attrs,
            ..Default::default()
        }
    }

    fn freeform(html: &str) -> Self {
        Self {
            name: None,
            inner_html: html.to_string(),
            inner_content: vec![Chunk::Html(html.to_string())],
            ..Default::default()
        }
    }

    fn push_html(&mut self, html: &str) {
        if html.is_empty() {
            return;
        }
        self.inner_html.push_str(html);
        self.inner_content.push(Chunk::Html(html.to_string()));
    }

    /// Visit this block and every descendant, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Block) -> bool) -> bool {
        if visit(self) {
            return true;
        }
        self.inner_blocks.iter().any(|b| b.walk(visit))
    }
}

fn delimiter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)<!--\s+(?P<closer>/)?wp:(?P<name>[a-z][a-z0-9_-]*(?:/[a-z][a-z0-9_-]*)?)\s+(?P<attrs>\{.*?\}\s+)?(?P<void>/)?-->",
        )
        .expect("block delimiter pattern is valid")
    })
}

fn class_attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\sclass\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
            .expect("class attribute pattern is valid")
    })
}

/// Resolve a delimiter name to its namespaced form.
pub fn full_name(name: &str) -> String {
    if name.contains('/') {
        name.to_string()
    } else {
        format!("{DEFAULT_NAMESPACE}{name}")
    }
}

struct Frame {
    block: Block,
    token_start: usize,
    /// End of the last consumed token inside this block
    prev_offset: usize,
}

/// Parse block markup into a tree. Malformed input never fails: unknown
/// closers are kept as HTML and unclosed blocks swallow the remainder.
pub fn parse_blocks(document: &str) -> Vec<Block> {
    let mut output = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut offset = 0usize;

    for caps in delimiter().captures_iter(document) {
        let Some(whole) = caps.get(0) else { continue };
        let (start, end) = (whole.start(), whole.end());
        let name = full_name(&caps["name"]);
        let is_closer = caps.name("closer").is_some();
        let is_void = caps.name("void").is_some();

        if is_closer {
            let Some(mut frame) = stack.pop() else {
                // stray closer with nothing open: leave it in the HTML stream
                continue;
            };
            frame.block.push_html(&document[frame.prev_offset..start]);
            match stack.last_mut() {
                Some(parent) => {
                    parent.block.push_html(&document[parent.prev_offset..frame.token_start]);
                    parent.block.inner_content.push(Chunk::Inner);
                    parent.block.inner_blocks.push(frame.block);
                    parent.prev_offset = end;
                }
                None => output.push(frame.block),
            }
            offset = end;
            continue;
        }

        let attrs = caps
            .name("attrs")
            .and_then(|m| serde_json::from_str::<Map<String, Value>>(m.as_str().trim()).ok())
            .unwrap_or_default();
        let block = Block::named(name, attrs);

        if stack.is_empty() {
            push_freeform(&mut output, &document[offset..start]);
        }

        if is_void {
            match stack.last_mut() {
                Some(parent) => {
                    parent.block.push_html(&document[parent.prev_offset..start]);
                    parent.block.inner_content.push(Chunk::Inner);
                    parent.block.inner_blocks.push(block);
                    parent.prev_offset = end;
                }
                None => output.push(block),
            }
        } else {
            stack.push(Frame {
                block,
                token_start: start,
                prev_offset: end,
            });
        }
        offset = end;
    }

    // Unclosed blocks take the rest of the document.
    let mut tail_consumed = false;
    while let Some(mut frame) = stack.pop() {
        if !tail_consumed {
            frame.block.push_html(&document[frame.prev_offset..]);
            tail_consumed = true;
        }
        match stack.last_mut() {
            Some(parent) => {
                parent.block.push_html(&document[parent.prev_offset..frame.token_start]);
                parent.block.inner_content.push(Chunk::Inner);
                parent.block.inner_blocks.push(frame.block);
                parent.prev_offset = document.len();
            }
            None => output.push(frame.block),
        }
    }
    if !tail_consumed {
        push_freeform(&mut output, &document[offset..]);
    }

    output
}

fn push_freeform(output: &mut Vec<Block>, html: &str) {
    if !html.is_empty() {
        output.push(Block::freeform(html));
    }
}

/// JSON-encode block attributes the way the delimiter grammar expects:
/// characters that could terminate or confuse the HTML comment are escaped.
pub fn encode_attributes(attrs: &Map<String, Value>) -> String {
    let json = serde_json::to_string(attrs).unwrap_or_else(|_| "{}".to_string());
    escape_quotes(&json)
        .replace("--", "\\u002d\\u002d")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Rewrite escaped quotes as `\u0022`, walking escape pairs so an escaped
/// backslash before a closing quote is left alone.
fn escape_quotes(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut chars = json.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push_str("\\u0022"),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Serialize one block. Empty content produces a void delimiter.
pub fn serialize_block(name: &str, attrs: &Map<String, Value>, content: &str) -> String {
    let short = name.strip_prefix(DEFAULT_NAMESPACE).unwrap_or(name);
    let attrs = if attrs.is_empty() {
        String::new()
    } else {
        format!(" {}", encode_attributes(attrs))
    };
    if content.is_empty() {
        format!("<!-- wp:{short}{attrs} /-->")
    } else {
        format!("<!-- wp:{short}{attrs} -->\n{content}\n<!-- /wp:{short} -->")
    }
}

/// Append `token` to a whitespace separated class list unless present.
pub fn merge_class_token(existing: &str, token: &str) -> String {
    let mut classes: Vec<&str> = existing.split_whitespace().collect();
    if !classes.contains(&token) {
        classes.push(token);
    }
    classes.join(" ")
}

/// Add `token` to the class attribute of the first HTML element in `html`,
/// creating the attribute when the element has none. Comments and block
/// delimiters before the element are skipped.
pub fn add_class_to_first_element(html: &str, token: &str) -> String {
    let Some((tag_start, tag_end)) = first_element(html) else {
        return html.to_string();
    };
    let tag = &html[tag_start..tag_end];

    let value = class_attribute()
        .captures(tag)
        .and_then(|caps| caps.name("dq").or_else(|| caps.name("sq")));
    let new_tag = match value {
        Some(value) => {
            let merged = merge_class_token(value.as_str(), token);
            format!("{}{}{}", &tag[..value.start()], merged, &tag[value.end()..])
        }
        None => {
            let name_end = tag[1..]
                .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
                .map(|i| i + 1)
                .unwrap_or(tag.len());
            format!("{} class=\"{}\"{}", &tag[..name_end], token, &tag[name_end..])
        }
    };

    format!("{}{}{}", &html[..tag_start], new_tag, &html[tag_end..])
}

/// Byte range of the first start tag, `>` included.
fn first_element(html: &str) -> Option<(usize, usize)> {
    let bytes = html.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        if html[i..].starts_with("<!--") {
            i += html[i..].find("-->").map(|p| p + 3)?;
            continue;
        }
        if bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            let mut quote: Option<u8> = None;
            for (j, &b) in bytes.iter().enumerate().skip(i + 1) {
                match (quote, b) {
                    (Some(q), c) if c == q => quote = None,
                    (Some(_), _) => {}
                    (None, b'"') | (None, b'\'') => quote = Some(b),
                    (None, b'>') => return Some((i, j + 1)),
                    _ => {}
                }
            }
            return None;
        }
        i += 1;
    }
    None
}
