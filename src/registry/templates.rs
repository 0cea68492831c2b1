//! Template and template-part registry.

use super::{
    finish_listing, group_by, humanize, Enablement, Group, Registry, RenderableUnit, TemplateUnit, UnitKind, UnitMeta,
};
use crate::dynamic::requires_context;
use crate::host::{TemplateDef, TemplateKind};
use crate::{Error, Result, Vrt};

/// One registry type serves both full templates and template parts.
pub struct TemplateRegistry<'a> {
    vrt: &'a Vrt,
    kind: UnitKind,
}

impl<'a> TemplateRegistry<'a> {
    /// `kind` must be [`UnitKind::Template`] or [`UnitKind::TemplatePart`].
    pub fn new(vrt: &'a Vrt, kind: UnitKind) -> Self {
        debug_assert!(matches!(kind, UnitKind::Template | UnitKind::TemplatePart));
        Self { vrt, kind }
    }

    fn host_kind(&self) -> TemplateKind {
        match self.kind {
            UnitKind::TemplatePart => TemplateKind::TemplatePart,
            _ => TemplateKind::Template,
        }
    }

    fn definitions(&self) -> Vec<TemplateDef> {
        let support = self.vrt.config.support_for(self.kind);
        self.vrt
            .host
            .catalog
            .templates(self.host_kind())
            .into_iter()
            .filter(|t| !t.slug.is_empty() && support.supports(&t.slug))
            .collect()
    }

    fn units(&self, include_disabled: bool) -> Vec<TemplateUnit> {
        let enablement = Enablement::read(self.vrt);
        let catalog = self.vrt.host.catalog.as_ref();
        let mut units: Vec<TemplateUnit> = Vec::new();
        for def in self.definitions() {
            if units.iter().any(|u| u.meta.slug == def.slug) {
                continue;
            }
            let enabled = enablement.is_enabled(self.kind, &def.slug);
            if !enabled && !include_disabled {
                continue;
            }
            units.push(TemplateUnit {
                meta: UnitMeta::new(&def.slug, def.slug.clone(), def.title.as_deref(), enabled),
                area: match self.kind {
                    UnitKind::TemplatePart => def.area.filter(|a| !a.is_empty()),
                    _ => None,
                },
                is_dynamic: requires_context(catalog, &self.vrt.hooks, &def.content),
            });
        }
        units
    }

    /// Enabled template parts grouped by placement area.
    pub fn area_groups(&self) -> Vec<Group> {
        let units = self.units(false);
        let areas: Vec<Vec<String>> = units.iter().map(|u| u.area.iter().cloned().collect()).collect();
        group_by(
            units
                .iter()
                .zip(&areas)
                .map(|(u, a)| (u.meta.identifier.as_str(), a.as_slice())),
            humanize,
        )
    }
}

impl Registry for TemplateRegistry<'_> {
    fn kind(&self) -> UnitKind {
        self.kind
    }

    fn list_discoverable(&self, include_disabled: bool) -> Vec<RenderableUnit> {
        let wrap = match self.kind {
            UnitKind::TemplatePart => RenderableUnit::TemplatePart,
            _ => RenderableUnit::Template,
        };
        let units = self.units(include_disabled).into_iter().map(wrap).collect();
        finish_listing(self.vrt, self.kind, units)
    }

    fn get_content(&self, slug: &str, _variation: Option<&str>) -> Result<String> {
        if slug.is_empty() {
            return Err(Error::NotFound(format!("{} without slug", self.kind)));
        }
        self.definitions()
            .into_iter()
            .find(|t| t.slug == slug)
            .map(|t| t.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Error::NotFound(format!("{} {slug}", self.kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SiteFixture;
    use crate::registry::DisabledSet;
    use crate::test_support::vrt_with;

    fn part(slug: &str, area: Option<&str>, content: &str) -> TemplateDef {
        TemplateDef {
            slug: slug.into(),
            title: None,
            content: content.into(),
            area: area.map(str::to_string),
        }
    }

    fn fixture() -> SiteFixture {
        SiteFixture {
            templates: vec![
                part("index", None, "<!-- wp:query --><!-- wp:post-template /--><!-- /wp:query -->"),
                part("empty", None, ""),
            ],
            template_parts: vec![
                part("header", Some("header"), "<!-- wp:site-title /-->"),
                part("footer", Some("footer"), "<p>footer</p>"),
                part("aside", None, "<p>aside</p>"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn lists_templates_with_dynamic_flag() {
        let vrt = vrt_with(fixture());
        let registry = TemplateRegistry::new(&vrt, UnitKind::Template);
        let units = registry.list_discoverable(false);
        assert_eq!(units.len(), 2);
        assert!(units[0].is_dynamic());
        assert_eq!(units[0].title(), "index");
        assert!(matches!(registry.get_content("empty", None), Err(Error::NotFound(_))));
        assert!(matches!(registry.get_content("", None), Err(Error::NotFound(_))));
    }

    #[test]
    fn disabled_parts_stay_reachable() {
        let vrt = vrt_with(fixture());
        let mut disabled = DisabledSet::default();
        disabled.set_disabled(UnitKind::TemplatePart, "footer", true);
        disabled
            .save(vrt.host.options.as_ref(), &vrt.config.disabled_option_key)
            .unwrap();

        let registry = TemplateRegistry::new(&vrt, UnitKind::TemplatePart);
        let enabled = registry.list_discoverable(false);
        let all = registry.list_discoverable(true);
        assert_eq!(enabled.len(), 2);
        assert_eq!(all.len(), 3);
        assert!(enabled.iter().all(|u| all.contains(u)));
        assert!(all.iter().any(|u| u.slug() == "footer" && !u.enabled()));
        assert_eq!(registry.get_content("footer", None).unwrap(), "<p>footer</p>");
    }

    #[test]
    fn parts_group_by_area() {
        let vrt = vrt_with(fixture());
        let groups = TemplateRegistry::new(&vrt, UnitKind::TemplatePart).area_groups();
        let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, ["Footer", "Header", "Uncategorized"]);
        assert_eq!(groups[2].members, ["aside"]);
    }
}
