//! Scenario registry.
//!
//! Scenarios are arbitrary pages registered through the
//! `register_scenarios` hook, each with static markup or a producer called
//! at render time.

use std::fmt;
use std::sync::Arc;

use super::{finish_listing, Enablement, Registry, RenderableUnit, ScenarioUnit, UnitKind, UnitMeta};
use crate::hooks::Hooks;
use crate::host::memory::FixtureScenario;
use crate::{Error, Result, Vrt};

/// Markup source of a scenario.
#[derive(Clone)]
pub enum ScenarioContent {
    Static(String),
    Producer(Arc<dyn Fn() -> String + Send + Sync>),
}

impl ScenarioContent {
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        ScenarioContent::Producer(Arc::new(f))
    }

    fn is_empty(&self) -> bool {
        matches!(self, ScenarioContent::Static(s) if s.is_empty())
    }

    fn produce(&self) -> String {
        match self {
            ScenarioContent::Static(s) => s.clone(),
            ScenarioContent::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for ScenarioContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioContent::Static(s) => f.debug_tuple("Static").field(&s.len()).finish(),
            ScenarioContent::Producer(_) => f.write_str("Producer"),
        }
    }
}

/// A scenario as registered.
#[derive(Debug, Clone)]
pub struct ScenarioDef {
    pub slug: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: ScenarioContent,
}

impl ScenarioDef {
    pub fn new(slug: &str, content: ScenarioContent) -> Self {
        Self {
            slug: slug.to_string(),
            title: None,
            description: None,
            content,
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

pub struct ScenarioRegistry<'a> {
    vrt: &'a Vrt,
}

impl<'a> ScenarioRegistry<'a> {
    pub fn new(vrt: &'a Vrt) -> Self {
        Self { vrt }
    }

    /// Registered scenarios with content, first registration per slug wins.
    pub fn definitions(&self) -> Vec<ScenarioDef> {
        let support = self.vrt.config.support_for(UnitKind::Scenario);
        let mut out: Vec<ScenarioDef> = Vec::new();
        for def in self.vrt.hooks.register_scenarios.apply(Vec::new(), &()) {
            if def.slug.is_empty() || def.content.is_empty() || !support.supports(&def.slug) {
                continue;
            }
            if out.iter().any(|d| d.slug == def.slug) {
                continue;
            }
            out.push(def);
        }
        out
    }
}

impl Registry for ScenarioRegistry<'_> {
    fn kind(&self) -> UnitKind {
        UnitKind::Scenario
    }

    fn list_discoverable(&self, include_disabled: bool) -> Vec<RenderableUnit> {
        let enablement = Enablement::read(self.vrt);
        let units = self
            .definitions()
            .into_iter()
            .filter_map(|def| {
                let enabled = enablement.is_enabled(UnitKind::Scenario, &def.slug);
                (enabled || include_disabled).then(|| {
                    RenderableUnit::Scenario(ScenarioUnit {
                        meta: UnitMeta::new(&def.slug, def.slug.clone(), def.title.as_deref(), enabled),
                        description: def.description,
                    })
                })
            })
            .collect();
        finish_listing(self.vrt, UnitKind::Scenario, units)
    }

    fn get_content(&self, slug: &str, _variation: Option<&str>) -> Result<String> {
        self.definitions()
            .into_iter()
            .find(|d| d.slug == slug)
            .map(|d| d.content.produce())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Error::NotFound(format!("scenario {slug}")))
    }
}

/// Register the static scenarios a fixture declares, after any already
/// registered.
pub fn register_fixture_scenarios(hooks: &mut Hooks, scenarios: &[FixtureScenario]) {
    let defs: Vec<ScenarioDef> = scenarios
        .iter()
        .map(|s| {
            let mut def = ScenarioDef::new(&s.slug, ScenarioContent::Static(s.content.clone()));
            def.title = s.title.clone();
            def.description = s.description.clone();
            def
        })
        .collect();
    hooks.register_scenarios.add(move |mut registered, _| {
        registered.extend(defs.iter().cloned());
        registered
    });
}
