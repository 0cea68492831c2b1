//! Host collaborators.
//!
//! The preview pipeline never talks to a CMS directly. Everything it needs
//! from the host (the registered block/pattern/template catalogs, the
//! content store, the active theme, block expansion, page-lifecycle output
//! and the persisted option store) is expressed as a trait here and bundled
//! into a [`Host`].
//!
//! [`memory::MemorySite`] implements every catalog-side trait from a JSON
//! fixture; [`options`] provides in-memory and file-backed option stores.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dynamic::RenderContext;
use crate::Result;

pub mod memory;
pub mod options;

pub use memory::{MemorySite, SiteFixture};
pub use options::{JsonFileOptions, MemoryOptions};

/// A named style alternative registered against a block type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStyle {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl BlockStyle {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: Some(label.to_string()),
        }
    }
}

/// One node of a block type's declared usage example.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleBlock {
    pub name: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub inner_blocks: Vec<ExampleBlock>,
}

/// Structured usage example declared by a block type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockExample {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub inner_blocks: Vec<ExampleBlock>,
}

/// A block type as registered with the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockType {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Blocks this one may only be nested in
    #[serde(default)]
    pub parent: Vec<String>,
    #[serde(default)]
    pub styles: Vec<BlockStyle>,
    #[serde(default)]
    pub example: Option<BlockExample>,
    /// The type has a server render callback (output depends on live data)
    #[serde(default)]
    pub dynamic: bool,
    /// Inline CSS the block registers for the front end
    #[serde(default)]
    pub style: Option<String>,
}

/// A pattern registered in the host's pattern catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternDef {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Which template catalog to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Template,
    TemplatePart,
}

/// A template or template part known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateDef {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub area: Option<String>,
}

/// Publication status of a stored content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Publish,
    Draft,
    Private,
    Pending,
    Future,
    Trash,
}

/// A stored content item (post, page, user pattern, reusable block, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    #[serde(default = "default_item_type")]
    pub item_type: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

fn default_item_type() -> String {
    "post".to_string()
}

/// Arguments for creating a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub content: String,
    pub status: ItemStatus,
    pub item_type: String,
}

impl Default for NewItem {
    fn default() -> Self {
        Self {
            title: "WP VRT Sample Post".to_string(),
            content: "This is sample content for dynamic template rendering.".to_string(),
            status: ItemStatus::Draft,
            item_type: "post".to_string(),
        }
    }
}

/// Result ordering for [`ItemQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemOrder {
    /// Title ascending (case-insensitive)
    TitleAsc,
    /// Most recently published first
    #[default]
    NewestFirst,
}

/// Filter for [`ContentStore::query`]. Empty vectors match everything.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub item_types: Vec<String>,
    pub statuses: Vec<ItemStatus>,
    pub order: ItemOrder,
    pub limit: Option<usize>,
}

/// Registered block types, patterns and templates.
pub trait SiteCatalog: Send + Sync {
    /// All registered block types, in registration order.
    fn block_types(&self) -> Vec<BlockType>;

    fn block_type(&self, name: &str) -> Option<BlockType> {
        self.block_types().into_iter().find(|b| b.name == name)
    }

    /// All registered patterns, in registration order.
    fn patterns(&self) -> Vec<PatternDef>;

    /// Display label of a pattern category, when the host knows one.
    fn pattern_category_label(&self, _slug: &str) -> Option<String> {
        None
    }

    fn templates(&self, kind: TemplateKind) -> Vec<TemplateDef>;

    fn language(&self) -> String {
        "en-US".to_string()
    }

    fn charset(&self) -> String {
        "UTF-8".to_string()
    }
}

/// Persisted content items.
pub trait ContentStore: Send + Sync {
    fn item_type_exists(&self, item_type: &str) -> bool;
    fn query(&self, query: &ItemQuery) -> Vec<Item>;
    fn get(&self, id: u64) -> Option<Item>;
    fn insert(&self, item: NewItem) -> Result<u64>;
    /// Permanently delete an item (no trash).
    fn delete(&self, id: u64) -> Result<()>;
}

/// The active theme.
pub trait ThemeSource: Send + Sync {
    /// Structured design configuration (theme.json shape), if any.
    fn design_config(&self) -> Option<Value>;
    /// Path of the theme's raw stylesheet file, if the theme has one.
    fn stylesheet_path(&self) -> Option<PathBuf>;
    /// The host's built-in block stylesheet bundle.
    fn block_library_css(&self) -> String;
}

/// Turns block markup into final HTML.
pub trait BlockExpander: Send + Sync {
    fn expand(&self, markup: &str, ctx: &RenderContext) -> Result<String>;
}

/// Output the host emits in the document head and before `</body>`.
pub trait PageLifecycle: Send + Sync {
    fn head(&self, ctx: &RenderContext) -> String;
    fn footer(&self, ctx: &RenderContext) -> String;
}

/// Persisted key-value options.
pub trait OptionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Every collaborator the pipeline consumes.
#[derive(Clone)]
pub struct Host {
    pub catalog: Arc<dyn SiteCatalog>,
    pub content: Arc<dyn ContentStore>,
    pub theme: Arc<dyn ThemeSource>,
    pub expander: Arc<dyn BlockExpander>,
    pub lifecycle: Arc<dyn PageLifecycle>,
    pub options: Arc<dyn OptionStore>,
}

impl Host {
    /// Build a host whose catalog-side collaborators are all one fixture site.
    pub fn from_site(site: Arc<MemorySite>, options: Arc<dyn OptionStore>) -> Self {
        Self {
            catalog: site.clone(),
            content: site.clone(),
            theme: site.clone(),
            expander: site.clone(),
            lifecycle: site,
            options,
        }
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
