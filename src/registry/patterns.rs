//! Pattern (content fragment) registry.
//!
//! Patterns come from the host's pattern catalog and, after it, from
//! user-authored fragments in the content store. Fragments in the
//! [`SELF_TEST_CATEGORY`] exercise the preview pipeline itself; they are
//! listed apart from ordinary patterns.

use super::{
    finish_listing, group_by, humanize, slugify, Enablement, Group, PatternSource, PatternUnit, Registry,
    RenderableUnit, UnitKind, UnitMeta, UNCATEGORIZED,
};
use crate::dynamic::requires_context;
use crate::host::{ItemOrder, ItemQuery, ItemStatus};
use crate::{Error, Result, Vrt};

/// Category reserved for fragments that test the renderer.
pub const SELF_TEST_CATEGORY: &str = "visual-regression-testing";

/// Content-store item types holding user-authored fragments.
const STORED_TYPES: [&str; 2] = ["wp_block_pattern", "wp_block"];

/// A pattern from either source, before enablement.
#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    title: Option<String>,
    content: String,
    categories: Vec<String>,
    source: PatternSource,
}

pub struct PatternRegistry<'a> {
    vrt: &'a Vrt,
}

impl<'a> PatternRegistry<'a> {
    pub fn new(vrt: &'a Vrt) -> Self {
        Self { vrt }
    }

    /// Catalog patterns first, then stored fragments. A name whose slug is
    /// already taken is skipped.
    fn candidates(&self) -> Vec<Candidate> {
        let support = self.vrt.config.support_for(UnitKind::Pattern);
        let mut out: Vec<Candidate> = Vec::new();
        let catalog = self.vrt.host.catalog.patterns().into_iter().map(|p| Candidate {
            name: p.name,
            title: p.title,
            content: p.content,
            categories: p.categories,
            source: PatternSource::Catalog,
        });
        for candidate in catalog.chain(self.stored()) {
            if candidate.name.is_empty() || !support.supports(&candidate.name) {
                continue;
            }
            let slug = slugify(&candidate.name);
            if out.iter().any(|c| slugify(&c.name) == slug) {
                continue;
            }
            out.push(candidate);
        }
        out
    }

    /// User-authored fragments from the content store.
    fn stored(&self) -> Vec<Candidate> {
        let content = self.vrt.host.content.as_ref();
        let item_types: Vec<String> = STORED_TYPES
            .iter()
            .filter(|t| content.item_type_exists(t))
            .map(|t| t.to_string())
            .collect();
        if item_types.is_empty() {
            return Vec::new();
        }
        let items = content.query(&ItemQuery {
            item_types,
            statuses: vec![
                ItemStatus::Publish,
                ItemStatus::Draft,
                ItemStatus::Private,
                ItemStatus::Pending,
                ItemStatus::Future,
            ],
            order: ItemOrder::TitleAsc,
            limit: None,
        });

        items
            .into_iter()
            .filter(|item| item.item_type == "wp_block_pattern" || !item.categories.is_empty())
            .map(|item| {
                let post_name = if item.slug.is_empty() {
                    format!("pattern-{}", item.id)
                } else {
                    item.slug.clone()
                };
                let title = if item.title.is_empty() { post_name.clone() } else { item.title };
                Candidate {
                    name: format!("user/{post_name}"),
                    title: Some(title),
                    content: item.content,
                    categories: item.categories,
                    source: PatternSource::Stored { id: item.id },
                }
            })
            .collect()
    }

    /// Every pattern, self-test ones included.
    fn list_all(&self, include_disabled: bool) -> Vec<PatternUnit> {
        let enablement = Enablement::read(self.vrt);
        let catalog = self.vrt.host.catalog.as_ref();
        let mut units = Vec::new();
        for candidate in self.candidates() {
            let enabled = enablement.is_enabled(UnitKind::Pattern, &candidate.name);
            if !enabled && !include_disabled {
                continue;
            }
            let categories = if candidate.categories.is_empty() {
                vec![UNCATEGORIZED.to_string()]
            } else {
                candidate.categories
            };
            units.push(PatternUnit {
                meta: UnitMeta::new(&candidate.name, slugify(&candidate.name), candidate.title.as_deref(), enabled),
                categories,
                is_dynamic: requires_context(catalog, &self.vrt.hooks, &candidate.content),
                source: candidate.source,
            });
        }
        units
    }

    /// Fragments in the self-test category.
    pub fn self_tests(&self, include_disabled: bool) -> Vec<RenderableUnit> {
        self.list_all(include_disabled)
            .into_iter()
            .filter(PatternUnit::is_self_test)
            .map(RenderableUnit::Pattern)
            .collect()
    }

    /// Ordinary patterns grouped by category.
    pub fn category_groups(&self) -> Vec<Group> {
        let units: Vec<PatternUnit> = self
            .list_all(false)
            .into_iter()
            .filter(|u| !u.is_self_test())
            .collect();
        let catalog = self.vrt.host.catalog.as_ref();
        group_by(
            units.iter().map(|u| (u.meta.identifier.as_str(), u.categories.as_slice())),
            |key| catalog.pattern_category_label(key).unwrap_or_else(|| humanize(key)),
        )
    }
}

impl Registry for PatternRegistry<'_> {
    fn kind(&self) -> UnitKind {
        UnitKind::Pattern
    }

    fn list_discoverable(&self, include_disabled: bool) -> Vec<RenderableUnit> {
        let units = self
            .list_all(include_disabled)
            .into_iter()
            .filter(|u| !u.is_self_test())
            .map(RenderableUnit::Pattern)
            .collect();
        finish_listing(self.vrt, UnitKind::Pattern, units)
    }

    fn get_content(&self, slug: &str, _variation: Option<&str>) -> Result<String> {
        self.candidates()
            .into_iter()
            .find(|c| slugify(&c.name) == slug)
            .map(|c| c.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Error::NotFound(format!("pattern {slug}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Item, PatternDef, SiteFixture};
    use crate::test_support::vrt_with;

    fn pattern(name: &str, categories: &[&str], content: &str) -> PatternDef {
        PatternDef {
            name: name.into(),
            title: None,
            content: content.into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn stored(id: u64, item_type: &str, slug: &str, title: &str, categories: &[&str]) -> Item {
        Item {
            id,
            item_type: item_type.into(),
            slug: slug.into(),
            title: title.into(),
            content: format!("<p>{title}</p>"),
            status: ItemStatus::Draft,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn fixture() -> SiteFixture {
        SiteFixture {
            patterns: vec![
                pattern("theme/hero", &["banner"], "<p>hero</p>"),
                pattern("theme/plain", &[], "<!-- wp:latest-posts /-->"),
                pattern("wp-vrt/kitchen-sink", &[SELF_TEST_CATEGORY], "<p>sink</p>"),
                pattern("user/taken", &[], "<p>catalog wins</p>"),
            ],
            item_types: vec!["wp_block_pattern".into()],
            items: vec![
                stored(10, "wp_block_pattern", "zeta", "Zeta", &[]),
                stored(11, "wp_block_pattern", "", "", &[]),
                stored(12, "wp_block", "synced", "Alpha", &["text"]),
                stored(13, "wp_block", "loose", "Loose", &[]),
                stored(14, "wp_block_pattern", "taken", "Taken", &[]),
                stored(15, "post", "hello", "Hello", &[]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn merges_catalog_and_stored_fragments() {
        let vrt = vrt_with(fixture());
        let units = PatternRegistry::new(&vrt).list_discoverable(false);
        let names: Vec<&str> = units.iter().map(RenderableUnit::identifier).collect();
        // stored fragments follow in title order; uncategorized wp_block items are skipped
        assert_eq!(
            names,
            ["theme/hero", "theme/plain", "user/taken", "user/pattern-11", "user/synced", "user/zeta"]
        );
        let RenderableUnit::Pattern(plain) = &units[1] else { panic!() };
        assert!(plain.is_dynamic);
        assert_eq!(plain.categories, [UNCATEGORIZED]);
        assert_eq!(units[3].title(), "pattern-11");
    }

    #[test]
    fn self_test_fragments_are_listed_apart() {
        let vrt = vrt_with(fixture());
        let registry = PatternRegistry::new(&vrt);
        assert!(registry
            .list_discoverable(true)
            .iter()
            .all(|u| u.identifier() != "wp-vrt/kitchen-sink"));
        let tests = registry.self_tests(false);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].slug(), "wp-vrt-kitchen-sink");
        assert_eq!(registry.get_content("wp-vrt-kitchen-sink", None).unwrap(), "<p>sink</p>");
    }

    #[test]
    fn catalog_wins_name_collisions() {
        let vrt = vrt_with(fixture());
        let registry = PatternRegistry::new(&vrt);
        assert_eq!(registry.get_content("user-taken", None).unwrap(), "<p>catalog wins</p>");
        assert!(registry.get_content("user-hello", None).is_err());
    }

    #[test]
    fn first_pattern_keeps_a_shared_slug() {
        let vrt = vrt_with(SiteFixture {
            patterns: vec![
                pattern("a/b-c", &[], "<p>first</p>"),
                pattern("a-b/c", &[], "<p>second</p>"),
            ],
            ..Default::default()
        });
        let registry = PatternRegistry::new(&vrt);
        let listed = registry.list_discoverable(true);
        let names: Vec<&str> = listed.iter().map(RenderableUnit::identifier).collect();
        assert_eq!(names, ["a/b-c"]);
        assert_eq!(listed[0].slug(), "a-b-c");
        assert_eq!(registry.get_content("a-b-c", None).unwrap(), "<p>first</p>");
    }

    #[test]
    fn groups_by_category_label() {
        let mut fixture = fixture();
        fixture.pattern_categories.insert("banner".into(), "Banners".into());
        let vrt = vrt_with(fixture);
        let groups = PatternRegistry::new(&vrt).category_groups();
        let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, ["Banners", "Text", "Uncategorized"]);
    }
}
