//! Discovery manifest.
//!
//! `GET /wp-json/wp-vrt/v1/discover` lists every previewable unit with its
//! relative preview URL. The same types deserialize the manifest on the
//! snapshot side, so every field has a default.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::{Registry, RenderableUnit, UnitKind};
use crate::router::{parse_target, Response};
use crate::Vrt;

/// Route the manifest is served on.
pub const DISCOVERY_PATH: &str = "/wp-json/wp-vrt/v1/discover";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub base_url: String,
    /// ISO-8601, UTC
    pub timestamp: String,
    pub items: ManifestItems,
}

/// The five unit lists, always present even when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestItems {
    pub blocks: Vec<BlockEntry>,
    pub patterns: Vec<PatternEntry>,
    pub template_parts: Vec<TemplatePartEntry>,
    pub templates: Vec<TemplateEntry>,
    pub scenarios: Vec<ScenarioEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockEntry {
    pub name: String,
    pub title: String,
    pub url: String,
    pub variations: Vec<VariationEntry>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariationEntry {
    pub name: String,
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternEntry {
    pub name: String,
    pub title: String,
    pub url: String,
    pub categories: Vec<String>,
    pub disabled: bool,
    pub is_dynamic: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateEntry {
    pub slug: String,
    pub title: String,
    pub url: String,
    pub disabled: bool,
    pub is_dynamic: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatePartEntry {
    pub slug: String,
    pub title: String,
    pub area: Option<String>,
    pub url: String,
    pub disabled: bool,
    pub is_dynamic: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioEntry {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub disabled: bool,
}

/// Whether a request target asks for disabled units too: the flag counts
/// when present with any value other than `0`.
pub fn include_disabled_requested(target: &str) -> bool {
    parse_target(target)
        .map(|url| {
            url.query_pairs()
                .any(|(k, v)| k == "include_disabled" && v != "0")
        })
        .unwrap_or(false)
}

/// Collect the manifest for the current site.
pub fn build_manifest(vrt: &Vrt, include_disabled: bool) -> Manifest {
    let registries = vrt.registries();
    let mut items = ManifestItems::default();

    for unit in registries.blocks.list_discoverable(include_disabled) {
        let RenderableUnit::Block(block) = unit else { continue };
        let url = vrt.unit_path(UnitKind::Block, &block.meta.slug);
        items.blocks.push(BlockEntry {
            variations: block
                .variations
                .iter()
                .map(|v| VariationEntry {
                    name: v.name.clone(),
                    label: v.label.clone(),
                    url: format!("{url}/{}", v.name),
                })
                .collect(),
            name: block.meta.identifier,
            title: block.meta.title,
            url,
            disabled: !block.meta.enabled,
        });
    }

    for unit in registries.patterns.list_discoverable(include_disabled) {
        let RenderableUnit::Pattern(pattern) = unit else { continue };
        items.patterns.push(PatternEntry {
            url: vrt.unit_path(UnitKind::Pattern, &pattern.meta.slug),
            name: pattern.meta.identifier,
            title: pattern.meta.title,
            categories: pattern.categories,
            disabled: !pattern.meta.enabled,
            is_dynamic: pattern.is_dynamic,
        });
    }

    for unit in registries.templates.list_discoverable(include_disabled) {
        let RenderableUnit::Template(template) = unit else { continue };
        items.templates.push(TemplateEntry {
            url: vrt.unit_path(UnitKind::Template, &template.meta.slug),
            slug: template.meta.slug,
            title: template.meta.title,
            disabled: !template.meta.enabled,
            is_dynamic: template.is_dynamic,
        });
    }

    for unit in registries.template_parts.list_discoverable(include_disabled) {
        let RenderableUnit::TemplatePart(part) = unit else { continue };
        items.template_parts.push(TemplatePartEntry {
            url: vrt.unit_path(UnitKind::TemplatePart, &part.meta.slug),
            slug: part.meta.slug,
            title: part.meta.title,
            area: part.area,
            disabled: !part.meta.enabled,
            is_dynamic: part.is_dynamic,
        });
    }

    // self-test fragments are listed as scenarios but keep their pattern URL
    let self_tests = registries.patterns.self_tests(include_disabled);
    for unit in registries
        .scenarios
        .list_discoverable(include_disabled)
        .into_iter()
        .chain(self_tests)
    {
        let description = match &unit {
            RenderableUnit::Scenario(s) => s.description.clone(),
            _ => None,
        };
        let meta = unit.meta();
        items.scenarios.push(ScenarioEntry {
            slug: meta.slug.clone(),
            title: meta.title.clone(),
            description,
            url: vrt.unit_path(unit.kind(), &meta.slug),
            disabled: !meta.enabled,
        });
    }

    Manifest {
        base_url: vrt.base_url(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        items,
    }
}

/// Serve the manifest for a request target.
pub fn respond(vrt: &Vrt, target: &str) -> Response {
    let manifest = build_manifest(vrt, include_disabled_requested(target));
    match serde_json::to_value(&manifest) {
        Ok(value) => Response::json(200, &value),
        Err(e) => Response::json(500, &serde_json::json!({ "code": "wp_vrt_error", "message": e.to_string() })),
    }
}
