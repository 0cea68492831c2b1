//! Unit registries.
//!
//! Five registries enumerate what can be previewed: blocks (components),
//! patterns (content fragments), templates, template parts and scenarios.
//! Each one answers two questions through the [`Registry`] trait: which
//! units belong in a catalog listing, and what markup a unit renders from.
//!
//! Listings honour the enable policy ([`SupportPolicy`] first, then the
//! persisted [`DisabledSet`]); direct content lookup only honours support,
//! so a disabled unit stays reachable by URL.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hooks::{ItemRef, VariationDef};
use crate::{Error, Result, Vrt};

pub mod blocks;
pub mod disabled;
pub mod patterns;
pub mod scenarios;
pub mod templates;

pub use blocks::{BlockRegistry, Family};
pub use disabled::DisabledSet;
pub use patterns::{PatternRegistry, SELF_TEST_CATEGORY};
pub use scenarios::{ScenarioContent, ScenarioDef, ScenarioRegistry};
pub use templates::TemplateRegistry;

/// Category assigned to fragments and parts that declare none.
pub const UNCATEGORIZED: &str = "uncategorized";

/// The five kinds of renderable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Block,
    Pattern,
    Template,
    TemplatePart,
    Scenario,
}

impl UnitKind {
    pub const ALL: [UnitKind; 5] = [
        UnitKind::Block,
        UnitKind::Pattern,
        UnitKind::Template,
        UnitKind::TemplatePart,
        UnitKind::Scenario,
    ];

    /// Route segment and disabled-set key.
    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Block => "block",
            UnitKind::Pattern => "pattern",
            UnitKind::Template => "template",
            UnitKind::TemplatePart => "template-part",
            UnitKind::Scenario => "scenario",
        }
    }

    /// Plural display label.
    pub fn label(self) -> &'static str {
        match self {
            UnitKind::Block => "Blocks",
            UnitKind::Pattern => "Patterns",
            UnitKind::Template => "Templates",
            UnitKind::TemplatePart => "Template Parts",
            UnitKind::Scenario => "Scenarios",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        UnitKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::Validation("Invalid VRT type".into()))
    }
}

/// URL-safe form of a namespaced identifier.
pub fn slugify(identifier: &str) -> String {
    identifier.replace('/', "-")
}

/// Metadata shared by every unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMeta {
    pub identifier: String,
    pub slug: String,
    pub title: String,
    pub enabled: bool,
}

impl UnitMeta {
    fn new(identifier: &str, slug: String, title: Option<&str>, enabled: bool) -> Self {
        Self {
            identifier: identifier.to_string(),
            slug,
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or(identifier)
                .to_string(),
            enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUnit {
    pub meta: UnitMeta,
    pub variations: Vec<VariationDef>,
    pub parent: Vec<String>,
    pub dynamic: bool,
}

/// Where a pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSource {
    Catalog,
    /// A user-authored fragment kept in the content store
    Stored { id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternUnit {
    pub meta: UnitMeta,
    pub categories: Vec<String>,
    pub is_dynamic: bool,
    pub source: PatternSource,
}

impl PatternUnit {
    pub fn is_self_test(&self) -> bool {
        self.categories.iter().any(|c| c == SELF_TEST_CATEGORY)
    }
}

/// A template or template part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateUnit {
    pub meta: UnitMeta,
    pub area: Option<String>,
    pub is_dynamic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioUnit {
    pub meta: UnitMeta,
    pub description: Option<String>,
}

/// A listed unit, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderableUnit {
    Block(BlockUnit),
    Pattern(PatternUnit),
    Template(TemplateUnit),
    TemplatePart(TemplateUnit),
    Scenario(ScenarioUnit),
}

impl RenderableUnit {
    pub fn kind(&self) -> UnitKind {
        match self {
            RenderableUnit::Block(_) => UnitKind::Block,
            RenderableUnit::Pattern(_) => UnitKind::Pattern,
            RenderableUnit::Template(_) => UnitKind::Template,
            RenderableUnit::TemplatePart(_) => UnitKind::TemplatePart,
            RenderableUnit::Scenario(_) => UnitKind::Scenario,
        }
    }

    pub fn meta(&self) -> &UnitMeta {
        match self {
            RenderableUnit::Block(u) => &u.meta,
            RenderableUnit::Pattern(u) => &u.meta,
            RenderableUnit::Template(u) | RenderableUnit::TemplatePart(u) => &u.meta,
            RenderableUnit::Scenario(u) => &u.meta,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.meta().identifier
    }

    pub fn slug(&self) -> &str {
        &self.meta().slug
    }

    pub fn title(&self) -> &str {
        &self.meta().title
    }

    pub fn enabled(&self) -> bool {
        self.meta().enabled
    }

    /// Whether rendering needs a dynamic context.
    pub fn is_dynamic(&self) -> bool {
        match self {
            RenderableUnit::Block(u) => u.dynamic,
            RenderableUnit::Pattern(u) => u.is_dynamic,
            RenderableUnit::Template(u) | RenderableUnit::TemplatePart(u) => u.is_dynamic,
            RenderableUnit::Scenario(_) => false,
        }
    }

    /// Route path below the virtual prefix, `{kind}/{slug}`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.kind(), self.slug())
    }
}

/// Enumerates one kind of unit and resolves its markup.
pub trait Registry {
    fn kind(&self) -> UnitKind;

    /// Units for catalog listings. Disabled units are only included on
    /// request; unsupported units never are.
    fn list_discoverable(&self, include_disabled: bool) -> Vec<RenderableUnit>;

    /// Markup of the unit with this slug. Not gated on the disabled set.
    fn get_content(&self, slug: &str, variation: Option<&str>) -> Result<String>;
}

/// Allow/deny lists deciding whether a unit exists for previewing at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportPolicy {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

impl SupportPolicy {
    pub fn deny(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allow: Vec::new(),
            deny: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// A non-empty allowlist is exclusive and the denylist is ignored.
    pub fn supports(&self, identifier: &str) -> bool {
        if !self.allow.is_empty() {
            return self.allow.iter().any(|a| a == identifier);
        }
        !self.deny.iter().any(|d| d == identifier)
    }
}

/// Enablement for one catalog read: a disabled-set snapshot plus the
/// `is_item_enabled` hook.
pub(crate) struct Enablement<'a> {
    vrt: &'a Vrt,
    disabled: DisabledSet,
}

impl<'a> Enablement<'a> {
    pub(crate) fn read(vrt: &'a Vrt) -> Self {
        Self {
            vrt,
            disabled: vrt.disabled_set(),
        }
    }

    pub(crate) fn is_enabled(&self, kind: UnitKind, identifier: &str) -> bool {
        let enabled = !self.disabled.contains(kind, identifier);
        self.vrt.hooks.is_item_enabled.apply(
            enabled,
            &ItemRef {
                kind,
                identifier: identifier.to_string(),
            },
        )
    }
}

/// Finish a listing: run the `discoverable` hook for its kind.
pub(crate) fn finish_listing(vrt: &Vrt, kind: UnitKind, units: Vec<RenderableUnit>) -> Vec<RenderableUnit> {
    vrt.hooks.discoverable.apply(units, &kind)
}

/// A labelled set of unit identifiers (pattern category, template-part area).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub key: String,
    pub title: String,
    pub members: Vec<String>,
}

/// Bucket `(identifier, keys)` pairs by key; an empty key list lands in
/// [`UNCATEGORIZED`]. Groups are sorted by title, case-insensitive.
pub(crate) fn group_by<'a, I>(entries: I, title_of: impl Fn(&str) -> String) -> Vec<Group>
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (identifier, keys) in entries {
        let keys: Vec<&str> = keys.iter().map(String::as_str).filter(|k| !k.is_empty()).collect();
        let keys = if keys.is_empty() { vec![UNCATEGORIZED] } else { keys };
        for key in keys {
            let members = buckets.entry(key.to_string()).or_default();
            if !members.iter().any(|m| m == identifier) {
                members.push(identifier.to_string());
            }
        }
    }
    let mut groups: Vec<Group> = buckets
        .into_iter()
        .map(|(key, members)| Group {
            title: title_of(&key),
            key,
            members,
        })
        .collect();
    groups.sort_by_key(|g| g.title.to_lowercase());
    groups
}

/// `site-header` -> `Site Header`.
pub fn humanize(key: &str) -> String {
    key.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// All five registries over one site.
pub struct Registries<'a> {
    pub blocks: BlockRegistry<'a>,
    pub patterns: PatternRegistry<'a>,
    pub templates: TemplateRegistry<'a>,
    pub template_parts: TemplateRegistry<'a>,
    pub scenarios: ScenarioRegistry<'a>,
}

impl<'a> Registries<'a> {
    pub fn new(vrt: &'a Vrt) -> Self {
        Self {
            blocks: BlockRegistry::new(vrt),
            patterns: PatternRegistry::new(vrt),
            templates: TemplateRegistry::new(vrt, UnitKind::Template),
            template_parts: TemplateRegistry::new(vrt, UnitKind::TemplatePart),
            scenarios: ScenarioRegistry::new(vrt),
        }
    }

    pub fn get(&self, kind: UnitKind) -> &dyn Registry {
        match kind {
            UnitKind::Block => &self.blocks,
            UnitKind::Pattern => &self.patterns,
            UnitKind::Template => &self.templates,
            UnitKind::TemplatePart => &self.template_parts,
            UnitKind::Scenario => &self.scenarios,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_route_segments() {
        for kind in UnitKind::ALL {
            assert_eq!(kind.as_str().parse::<UnitKind>().unwrap(), kind);
        }
        let err = "widget".parse::<UnitKind>().unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(serde_json::to_string(&UnitKind::TemplatePart).unwrap(), "\"template-part\"");
    }

    #[test]
    fn allowlist_overrides_denylist() {
        let policy = SupportPolicy {
            allow: vec!["core/quote".into()],
            deny: vec!["core/quote".into()],
        };
        assert!(policy.supports("core/quote"));
        assert!(!policy.supports("core/paragraph"));

        let deny = SupportPolicy::deny(["core/pattern"]);
        assert!(!deny.supports("core/pattern"));
        assert!(deny.supports("core/paragraph"));
    }

    #[test]
    fn groups_default_to_uncategorized_and_sort_by_title() {
        let a = vec!["text".to_string()];
        let b: Vec<String> = vec![];
        let c = vec!["Banner".to_string(), "text".to_string()];
        let groups = group_by(
            [("p/a", a.as_slice()), ("p/b", b.as_slice()), ("p/c", c.as_slice())],
            humanize,
        );
        let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, ["Banner", "Text", "Uncategorized"]);
        assert_eq!(groups[1].members, ["p/a", "p/c"]);
        assert_eq!(groups[2].members, ["p/b"]);
    }

    #[test]
    fn slugs_replace_namespace_separator() {
        assert_eq!(slugify("core/paragraph"), "core-paragraph");
        assert_eq!(humanize("site-header_area"), "Site Header Area");
    }
}
