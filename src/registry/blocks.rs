//! Block (component) registry.

use serde::{Deserialize, Serialize};

use super::{finish_listing, slugify, BlockUnit, Enablement, Registry, RenderableUnit, SupportPolicy, UnitKind, UnitMeta};
use crate::dynamic::is_dynamic_block;
use crate::hooks::VariationDef;
use crate::host::BlockType;
use crate::sample::Synthesizer;
use crate::{Error, Result, Vrt};

/// A set of blocks that are previewed together (container + items).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub title: String,
    pub description: String,
    pub blocks: Vec<String>,
}

impl Family {
    pub fn new(title: &str, description: &str, blocks: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            blocks: blocks.iter().map(|b| b.to_string()).collect(),
        }
    }
}

/// Families every site starts from.
pub fn seed_families() -> Vec<Family> {
    vec![
        Family::new("Columns", "Columns work with Column child blocks.", &["core/columns", "core/column"]),
        Family::new("Buttons", "Buttons container with Button items.", &["core/buttons", "core/button"]),
        Family::new("Gallery", "Gallery uses Image items.", &["core/gallery", "core/image"]),
        Family::new(
            "Navigation",
            "Navigation is composed of link and submenu blocks.",
            &["core/navigation", "core/navigation-link", "core/navigation-submenu"],
        ),
    ]
}

/// Append `child` to the first family listing `parent`, or start a new
/// family for the pair.
pub fn add_family_member(families: &mut Vec<Family>, parent: &str, child: &str) {
    if let Some(family) = families.iter_mut().find(|f| f.blocks.iter().any(|b| b == parent)) {
        if !family.blocks.iter().any(|b| b == child) {
            family.blocks.push(child.to_string());
        }
        return;
    }
    families.push(Family {
        title: parent.to_string(),
        description: format!("Auto-grouped blocks for {parent}."),
        blocks: vec![parent.to_string(), child.to_string()],
    });
}

/// Deduplicate members and drop families left empty.
pub fn normalize_families(families: Vec<Family>) -> Vec<Family> {
    families
        .into_iter()
        .filter_map(|mut family| {
            let mut seen = Vec::with_capacity(family.blocks.len());
            family.blocks.retain(|b| {
                if b.is_empty() || seen.contains(b) {
                    return false;
                }
                seen.push(b.clone());
                true
            });
            if family.blocks.is_empty() {
                return None;
            }
            if family.title.is_empty() {
                family.title = "Block Family".to_string();
            }
            Some(family)
        })
        .collect()
}

pub struct BlockRegistry<'a> {
    vrt: &'a Vrt,
}

impl<'a> BlockRegistry<'a> {
    pub fn new(vrt: &'a Vrt) -> Self {
        Self { vrt }
    }

    /// Support policy after the allowlist/denylist hooks.
    pub fn support(&self) -> SupportPolicy {
        let base = self.vrt.config.support_for(UnitKind::Block);
        SupportPolicy {
            allow: self.vrt.hooks.block_allowlist.apply(base.allow, &()),
            deny: self.vrt.hooks.block_denylist.apply(base.deny, &()),
        }
    }

    /// Registered block types that may be previewed at all.
    pub fn supported_types(&self) -> Vec<BlockType> {
        let support = self.support();
        self.vrt
            .host
            .catalog
            .block_types()
            .into_iter()
            .filter(|t| support.supports(&t.name))
            .collect()
    }

    /// Block name behind a slug, first match wins.
    pub fn name_for_slug(&self, slug: &str) -> Option<String> {
        if slug.is_empty() {
            return None;
        }
        self.supported_types()
            .into_iter()
            .find(|t| slugify(&t.name) == slug)
            .map(|t| t.name)
    }

    /// Named style alternatives of a block, in registration order.
    pub fn variations(&self, block_type: &BlockType) -> Vec<VariationDef> {
        let registered = block_type
            .styles
            .iter()
            .filter(|s| !s.name.is_empty())
            .map(|s| VariationDef {
                name: s.name.clone(),
                label: s.label.clone().unwrap_or_else(|| s.name.clone()),
            })
            .collect();
        self.vrt.hooks.block_variations.apply(registered, &block_type.name)
    }

    /// Seed families plus families derived from declared parents.
    pub fn families(&self) -> Vec<Family> {
        let mut families = self.vrt.hooks.block_families.apply(seed_families(), &());
        for block_type in self.supported_types() {
            for parent in &block_type.parent {
                add_family_member(&mut families, parent, &block_type.name);
            }
        }
        normalize_families(families)
    }
}

impl Registry for BlockRegistry<'_> {
    fn kind(&self) -> UnitKind {
        UnitKind::Block
    }

    fn list_discoverable(&self, include_disabled: bool) -> Vec<RenderableUnit> {
        let enablement = Enablement::read(self.vrt);
        let catalog = self.vrt.host.catalog.as_ref();
        let mut units: Vec<RenderableUnit> = Vec::new();
        // The first block to claim a slug owns it, enabled or not.
        let mut seen: Vec<String> = Vec::new();
        for block_type in self.supported_types() {
            let slug = slugify(&block_type.name);
            if seen.contains(&slug) {
                continue;
            }
            seen.push(slug.clone());
            let enabled = enablement.is_enabled(UnitKind::Block, &block_type.name);
            if !enabled && !include_disabled {
                continue;
            }
            units.push(RenderableUnit::Block(BlockUnit {
                meta: UnitMeta::new(&block_type.name, slug, block_type.title.as_deref(), enabled),
                variations: self.variations(&block_type),
                parent: block_type.parent.clone(),
                dynamic: is_dynamic_block(catalog, &self.vrt.hooks, &block_type.name),
            }));
        }
        finish_listing(self.vrt, UnitKind::Block, units)
    }

    fn get_content(&self, slug: &str, variation: Option<&str>) -> Result<String> {
        let name = self
            .name_for_slug(slug)
            .ok_or_else(|| Error::NotFound(format!("block {slug}")))?;
        let markup = Synthesizer::new(self.vrt.host.catalog.as_ref(), &self.vrt.hooks).synthesize(&name, variation);
        if markup.is_empty() {
            return Err(Error::NotFound(format!("block {slug}")));
        }
        Ok(markup)
    }
}
