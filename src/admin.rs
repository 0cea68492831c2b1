//! Privileged endpoints.
//!
//! Everything below `/wp-vrt-admin/` needs an admin bearer key. State
//! changes (the disabled-set toggles) also need a replay-protection token
//! issued for the same user and action. Each toggle exists twice: a form
//! variant that answers with a `303` redirect and an AJAX variant that
//! answers with a JSON envelope:
//!
//! ```json
//! { "success": false, "data": { "code": "invalid_nonce", "message": "..." } }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use url::form_urlencoded;

use crate::discovery::DISCOVERY_PATH;
use crate::registry::{Family, Group, Registry, RenderableUnit, UnitKind};
use crate::router::{error_page, parse_target, Response};
use crate::{Error, Result, Vrt};

pub const ADMIN_PREFIX: &str = "/wp-vrt-admin";

/// Where form toggles redirect when the request names no target.
pub const DEFAULT_REDIRECT: &str = "/wp-vrt-admin/catalog";

/// Seconds in one token tick. A token stays valid for two ticks.
const NONCE_TICK_SECS: i64 = 12 * 60 * 60;

/// Replay-protection tokens bound to a user and an action.
#[derive(Debug, Clone)]
pub struct Nonces {
    secret: String,
}

impl Nonces {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    fn tick(now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(NONCE_TICK_SECS) + 1
    }

    fn token(&self, tick: i64, action: &str, user: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{tick}|{action}|{user}|{}", self.secret).as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn issue(&self, action: &str, user: &str, now: DateTime<Utc>) -> String {
        self.token(Self::tick(now), action, user)
    }

    /// Accepts tokens from the current and the previous tick.
    pub fn verify(&self, token: &str, action: &str, user: &str, now: DateTime<Utc>) -> bool {
        if token.is_empty() {
            return false;
        }
        let tick = Self::tick(now);
        [tick, tick - 1].into_iter().fold(false, |matched, t| {
            matched | constant_time_eq(self.token(t, action, user).as_bytes(), token.as_bytes())
        })
    }
}

/// Byte comparison whose running time does not depend on where the
/// inputs first differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// What a toggle applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleScope {
    /// One identifier
    Item,
    /// Every unit of a kind
    Type,
    /// An explicit list of identifiers
    Group,
}

impl ToggleScope {
    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "item" => Some(ToggleScope::Item),
            "type" => Some(ToggleScope::Type),
            "group" => Some(ToggleScope::Group),
            _ => None,
        }
    }

    /// Token action for this scope.
    pub fn action(self) -> &'static str {
        match self {
            ToggleScope::Item => "wp_vrt_toggle_item",
            ToggleScope::Type => "wp_vrt_toggle_type",
            ToggleScope::Group => "wp_vrt_toggle_group",
        }
    }
}

/// An admin request as the server received it.
#[derive(Debug, Clone, Default)]
pub struct AdminRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    /// `application/x-www-form-urlencoded` body, if any
    pub body: String,
}

impl AdminRequest {
    pub fn new(method: &str, target: &str) -> Self {
        Self {
            method: method.to_string(),
            target: target.to_string(),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Query parameters followed by form fields.
    fn params(&self) -> Params {
        let mut pairs: Vec<(String, String)> = parse_target(&self.target)
            .map(|url| url.query_pairs().into_owned().collect())
            .unwrap_or_default();
        pairs.extend(form_urlencoded::parse(self.body.as_bytes()).into_owned());
        Params(pairs)
    }

    fn path(&self) -> String {
        parse_target(&self.target)
            .map(|url| url.path().trim_end_matches('/').to_string())
            .unwrap_or_default()
    }
}

struct Params(Vec<(String, String)>);

impl Params {
    fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Validation(format!("Missing parameter: {name}")))
    }

    /// Values of `name` or `name[]`; each value may hold a comma list.
    fn list(&self, name: &str) -> Vec<String> {
        let array = format!("{name}[]");
        self.0
            .iter()
            .filter(|(k, _)| *k == name || *k == array)
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect()
    }

    fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name).map(str::trim) {
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some("0" | "false" | "no" | "off") => Ok(false),
            Some(other) => Err(Error::Validation(format!("Invalid value for {name}: {other}"))),
            None => Err(Error::Validation(format!("Missing parameter: {name}"))),
        }
    }
}

/// Resolve the admin user from an `Authorization: Bearer <key>` header.
pub fn authenticate(vrt: &Vrt, request: &AdminRequest) -> Result<String> {
    let key = request
        .header_value("Authorization")
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::Unauthorized("You do not have permission to manage VRT items.".into()))?;
    vrt.config
        .admin_keys
        .get(key)
        .cloned()
        .ok_or_else(|| Error::Unauthorized("You do not have permission to manage VRT items.".into()))
}

fn check_nonce(vrt: &Vrt, request: &AdminRequest, params: &Params, user: &str, action: &str) -> Result<()> {
    let token = params
        .get("_wpnonce")
        .or_else(|| request.header_value("X-WP-Nonce"))
        .unwrap_or_default();
    if Nonces::new(&vrt.config.nonce_secret).verify(token, action, user, Utc::now()) {
        Ok(())
    } else {
        Err(Error::Unauthorized("The link you followed has expired.".into()))
    }
}

/// Result of one applied toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub disabled: bool,
    /// Identifiers the toggle applied to
    pub items: Vec<String>,
    /// Everything of this kind disabled afterwards
    pub disabled_items: Vec<String>,
}

/// Every identifier of `kind`, disabled ones included.
fn all_identifiers(vrt: &Vrt, kind: UnitKind) -> Vec<String> {
    let registries = vrt.registries();
    let mut units = registries.get(kind).list_discoverable(true);
    if kind == UnitKind::Pattern {
        units.extend(registries.patterns.self_tests(true));
    }
    units.iter().map(|u| u.identifier().to_string()).collect()
}

/// Apply a toggle to the persisted disabled set.
pub fn apply_toggle(vrt: &Vrt, scope: ToggleScope, kind: UnitKind, ids: Vec<String>, disabled: bool) -> Result<ToggleOutcome> {
    let store = vrt.host.options.as_ref();
    let key = &vrt.config.disabled_option_key;
    let mut set = crate::DisabledSet::load(store, key)?;
    let items = match scope {
        ToggleScope::Item | ToggleScope::Group => {
            set.set_disabled_for_group(kind, &ids, disabled);
            ids
        }
        ToggleScope::Type => {
            let ids = all_identifiers(vrt, kind);
            set.set_disabled_for_all(kind, &ids, disabled);
            ids
        }
    };
    set.save(store, key)?;
    info!(
        "{} {} {kind} item(s)",
        if disabled { "disabled" } else { "enabled" },
        items.len()
    );
    Ok(ToggleOutcome {
        kind,
        disabled,
        items,
        disabled_items: set.ids(kind).into_iter().map(String::from).collect(),
    })
}

fn toggle(vrt: &Vrt, request: &AdminRequest, scope: ToggleScope) -> Result<ToggleOutcome> {
    let user = authenticate(vrt, request)?;
    let params = request.params();
    check_nonce(vrt, request, &params, &user, scope.action())?;

    let kind: UnitKind = params.required("type")?.parse()?;
    let disabled = params.flag("disabled")?;
    let ids = match scope {
        ToggleScope::Item => vec![params.required("id")?.to_string()],
        ToggleScope::Group => {
            let ids = params.list("ids");
            if ids.is_empty() {
                return Err(Error::Validation("Missing parameter: ids".into()));
            }
            ids
        }
        ToggleScope::Type => Vec::new(),
    };
    apply_toggle(vrt, scope, kind, ids, disabled)
}

fn envelope_error(err: &Error) -> Response {
    let code = match err {
        Error::Unauthorized(_) => "forbidden",
        Error::Validation(_) => "invalid_request",
        _ => "wp_vrt_error",
    };
    let message = match err {
        Error::Unauthorized(m) | Error::Validation(m) => m.clone(),
        other => other.to_string(),
    };
    Response::json(
        err.status(),
        &json!({ "success": false, "data": { "code": code, "message": message } }),
    )
}

/// A relative redirect target from the request, or the catalog.
fn redirect_target(request: &AdminRequest) -> String {
    request
        .params()
        .get("redirect_to")
        .filter(|t| t.starts_with('/') && !t.starts_with("//"))
        .unwrap_or(DEFAULT_REDIRECT)
        .to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewItem {
    pub label: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_dynamic: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyGroup {
    pub title: String,
    pub description: String,
    pub items: Vec<OverviewItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub title: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<FamilyGroup>,
    pub items: Vec<OverviewItem>,
}

/// Catalog overview for the admin screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOverview {
    pub base_url: String,
    pub discovery_url: String,
    pub stats: BTreeMap<&'static str, usize>,
    pub sections: Vec<Section>,
    pub pattern_categories: Vec<Group>,
    pub part_areas: Vec<Group>,
}

fn resolve_families(families: &[Family], blocks: &[RenderableUnit], base_url: &str) -> Vec<FamilyGroup> {
    families
        .iter()
        .filter_map(|family| {
            let items: Vec<OverviewItem> = family
                .blocks
                .iter()
                .filter_map(|name| blocks.iter().find(|b| b.identifier() == name))
                .map(|b| OverviewItem {
                    label: b.title().to_string(),
                    url: format!("{base_url}/block/{}", b.slug()),
                    is_dynamic: None,
                })
                .collect();
            if items.is_empty() {
                return None;
            }
            Some(FamilyGroup {
                title: family.title.clone(),
                description: family.description.clone(),
                items,
            })
        })
        .collect()
}

pub fn catalog_overview(vrt: &Vrt) -> CatalogOverview {
    let registries = vrt.registries();
    let base_url = vrt.base_url();
    let item = |unit: &RenderableUnit, label: String, dynamic: bool| OverviewItem {
        label,
        url: format!("{base_url}/{}", unit.path()),
        is_dynamic: dynamic.then_some(unit.is_dynamic()),
    };

    let blocks = registries.blocks.list_discoverable(false);
    let patterns = registries.patterns.list_discoverable(false);
    let templates = registries.templates.list_discoverable(false);
    let parts = registries.template_parts.list_discoverable(false);
    let mut scenarios = registries.scenarios.list_discoverable(false);
    scenarios.extend(registries.patterns.self_tests(false));

    let mut block_items = Vec::new();
    for unit in &blocks {
        block_items.push(item(unit, unit.title().to_string(), false));
        if let RenderableUnit::Block(block) = unit {
            for variation in &block.variations {
                block_items.push(OverviewItem {
                    label: format!("{} - {}", unit.title(), variation.label),
                    url: format!("{base_url}/{}/{}", unit.path(), variation.name),
                    is_dynamic: None,
                });
            }
        }
    }

    let part_items = parts
        .iter()
        .map(|unit| {
            let label = match unit {
                RenderableUnit::TemplatePart(part) => match part.area.as_deref().filter(|a| !a.is_empty()) {
                    Some(area) => format!("{} ({area})", unit.title()),
                    None => unit.title().to_string(),
                },
                _ => unit.title().to_string(),
            };
            item(unit, label, true)
        })
        .collect();

    let mut stats = BTreeMap::new();
    stats.insert(UnitKind::Block.label(), blocks.len());
    stats.insert(UnitKind::Pattern.label(), patterns.len());
    stats.insert(UnitKind::Template.label(), templates.len());
    stats.insert(UnitKind::TemplatePart.label(), parts.len());
    stats.insert(UnitKind::Scenario.label(), scenarios.len());

    let sections = vec![
        Section {
            title: "Blocks",
            description: "All registered blocks including variations.",
            groups: resolve_families(&registries.blocks.families(), &blocks, &base_url),
            items: block_items,
        },
        Section {
            title: "Patterns",
            description: "Theme and core patterns.",
            groups: Vec::new(),
            items: patterns.iter().map(|u| item(u, u.title().to_string(), true)).collect(),
        },
        Section {
            title: "Templates",
            description: "Site templates for block themes.",
            groups: Vec::new(),
            items: templates.iter().map(|u| item(u, u.title().to_string(), true)).collect(),
        },
        Section {
            title: "Template Parts",
            description: "Reusable template fragments.",
            groups: Vec::new(),
            items: part_items,
        },
        Section {
            title: "Scenarios",
            description: "Custom scenarios registered by themes/plugins.",
            groups: Vec::new(),
            items: scenarios.iter().map(|u| item(u, u.title().to_string(), false)).collect(),
        },
    ];

    CatalogOverview {
        discovery_url: vrt.home_url(DISCOVERY_PATH),
        base_url,
        stats,
        sections,
        pattern_categories: registries.patterns.category_groups(),
        part_areas: registries.template_parts.area_groups(),
    }
}

/// Answer a request below [`ADMIN_PREFIX`]; `None` for anything else.
pub fn respond(vrt: &Vrt, request: &AdminRequest) -> Option<Response> {
    let path = request.path();
    let rest = path.strip_prefix(ADMIN_PREFIX)?;
    let method = request.method.to_ascii_uppercase();

    if let Some(segment) = rest.strip_prefix("/ajax/toggle/") {
        let scope = ToggleScope::parse(segment)?;
        if method != "POST" {
            return Some(envelope_error(&Error::Validation("Toggles must be POSTed".into())));
        }
        return Some(match toggle(vrt, request, scope) {
            Ok(outcome) => Response::json(200, &json!({ "success": true, "data": outcome })),
            Err(e) => envelope_error(&e),
        });
    }

    if let Some(segment) = rest.strip_prefix("/toggle/") {
        let scope = ToggleScope::parse(segment)?;
        if method != "POST" {
            return Some(error_page(405, "Method Not Allowed", "Toggles must be POSTed"));
        }
        return Some(match toggle(vrt, request, scope) {
            Ok(_) => Response::redirect(&redirect_target(request)),
            Err(e) => crate::router::error_response(&e),
        });
    }

    let result = match rest {
        "/nonce" => authenticate(vrt, request).and_then(|user| {
            let params = request.params();
            let action = params.required("action")?;
            let nonce = Nonces::new(&vrt.config.nonce_secret).issue(action, &user, Utc::now());
            Ok(json!({ "action": action, "nonce": nonce }))
        }),
        "/catalog" => authenticate(vrt, request)
            .and_then(|_| serde_json::to_value(catalog_overview(vrt)).map_err(Error::from)),
        _ => return None,
    };
    Some(match result {
        Ok(value) => Response::json(200, &value),
        Err(e) => envelope_error(&e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::host::{PatternDef, SiteFixture, TemplateDef};
    use crate::test_support::vrt_with;
    use crate::DisabledSet;

    const KEY: &str = "secret-key";

    fn admin_vrt() -> Vrt {
        let mut vrt = vrt_with(SiteFixture {
            patterns: vec![PatternDef {
                name: "theme/hero".into(),
                title: Some("Hero".into()),
                content: "<p>hero</p>".into(),
                categories: vec!["banner".into()],
            }],
            template_parts: vec![TemplateDef {
                slug: "footer".into(),
                title: Some("Footer".into()),
                content: "<p>footer</p>".into(),
                area: Some("footer".into()),
            }],
            ..Default::default()
        });
        vrt.config.admin_keys.insert(KEY.into(), "admin".into());
        vrt
    }

    fn signed(vrt: &Vrt, target: &str, scope: ToggleScope, body: &str) -> AdminRequest {
        let nonce = Nonces::new(&vrt.config.nonce_secret).issue(scope.action(), "admin", Utc::now());
        AdminRequest::new("POST", target)
            .header("Authorization", &format!("Bearer {KEY}"))
            .header("X-WP-Nonce", &nonce)
            .body(body)
    }

    fn disabled(vrt: &Vrt) -> DisabledSet {
        vrt.disabled_set()
    }

    #[test]
    fn nonces_expire_after_two_ticks() {
        let nonces = Nonces::new("s");
        let issued = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let token = nonces.issue("act", "admin", issued);
        assert_eq!(token.len(), 64);
        assert!(nonces.verify(&token, "act", "admin", issued));
        assert!(nonces.verify(&token, "act", "admin", issued + chrono::Duration::hours(12)));
        assert!(!nonces.verify(&token, "act", "admin", issued + chrono::Duration::hours(36)));
        assert!(!nonces.verify(&token, "other", "admin", issued));
        assert!(!nonces.verify(&token, "act", "editor", issued));
        assert!(!nonces.verify("", "act", "admin", issued));
    }

    #[test]
    fn near_miss_tokens_are_rejected() {
        let nonces = Nonces::new("s");
        let issued = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let token = nonces.issue("act", "admin", issued);

        let mut flipped = token.clone().into_bytes();
        let last = flipped.len() - 1;
        flipped[last] = if flipped[last] == b'0' { b'1' } else { b'0' };
        let flipped = String::from_utf8(flipped).unwrap();
        assert!(!nonces.verify(&flipped, "act", "admin", issued));
        assert!(!nonces.verify(&token[..63], "act", "admin", issued));
        assert!(!nonces.verify(&format!("{token}0"), "act", "admin", issued));

        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn ajax_item_toggle_round_trip() {
        let vrt = admin_vrt();
        let target = "/wp-vrt-admin/ajax/toggle/item";
        let response = respond(&vrt, &signed(&vrt, target, ToggleScope::Item, "type=block&id=core%2Fquote&disabled=1")).unwrap();
        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["disabled_items"], json!(["core/quote"]));
        assert!(disabled(&vrt).contains(UnitKind::Block, "core/quote"));

        let response = respond(&vrt, &signed(&vrt, target, ToggleScope::Item, "type=block&id=core%2Fquote&disabled=0")).unwrap();
        assert_eq!(response.status, 200);
        assert!(disabled(&vrt).is_empty());
    }

    #[test]
    fn ajax_rejects_missing_capability_or_token() {
        let vrt = admin_vrt();
        let target = "/wp-vrt-admin/ajax/toggle/item";
        let anonymous = AdminRequest::new("POST", target).body("type=block&id=core%2Fquote&disabled=1");
        let response = respond(&vrt, &anonymous).unwrap();
        assert_eq!(response.status, 403);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["success"], false);

        let wrong_action = signed(&vrt, target, ToggleScope::Type, "type=block&id=core%2Fquote&disabled=1");
        assert_eq!(respond(&vrt, &wrong_action).unwrap().status, 403);
        assert!(disabled(&vrt).is_empty());
    }

    #[test]
    fn ajax_rejects_bad_parameters() {
        let vrt = admin_vrt();
        let target = "/wp-vrt-admin/ajax/toggle/item";
        for body in ["type=widget&id=x&disabled=1", "type=block&disabled=1", "type=block&id=x&disabled=maybe"] {
            let response = respond(&vrt, &signed(&vrt, target, ToggleScope::Item, body)).unwrap();
            assert_eq!(response.status, 400, "{body}");
        }
        let group = respond(&vrt, &signed(&vrt, "/wp-vrt-admin/ajax/toggle/group", ToggleScope::Group, "type=block&disabled=1")).unwrap();
        assert_eq!(group.status, 400);
    }

    #[test]
    fn type_toggle_disables_everything_then_clears_entry() {
        let vrt = admin_vrt();
        let target = "/wp-vrt-admin/ajax/toggle/type";
        respond(&vrt, &signed(&vrt, target, ToggleScope::Type, "type=template-part&disabled=1")).unwrap();
        assert_eq!(disabled(&vrt).ids(UnitKind::TemplatePart), ["footer"]);
        respond(&vrt, &signed(&vrt, target, ToggleScope::Type, "type=template-part&disabled=0")).unwrap();
        assert!(!disabled(&vrt).has_entry(UnitKind::TemplatePart));
    }

    #[test]
    fn form_group_toggle_redirects() {
        let vrt = admin_vrt();
        let request = signed(
            &vrt,
            "/wp-vrt-admin/toggle/group?redirect_to=/wp-vrt-admin/catalog%3Ftab%3Dpatterns",
            ToggleScope::Group,
            "type=block&ids%5B%5D=core%2Fquote&ids%5B%5D=core%2Fverse&disabled=1",
        );
        let response = respond(&vrt, &request).unwrap();
        assert_eq!(response.status, 303);
        assert_eq!(response.header("Location"), Some("/wp-vrt-admin/catalog?tab=patterns"));
        assert_eq!(disabled(&vrt).ids(UnitKind::Block), ["core/quote", "core/verse"]);
    }

    #[test]
    fn form_toggle_failure_is_an_error_page() {
        let vrt = admin_vrt();
        let response = respond(&vrt, &AdminRequest::new("POST", "/wp-vrt-admin/toggle/item")).unwrap();
        assert_eq!(response.status, 403);
        assert!(response.body.contains("<title>Forbidden</title>"));
    }

    #[test]
    fn nonce_endpoint_issues_verifiable_tokens() {
        let vrt = admin_vrt();
        let request = AdminRequest::new("GET", "/wp-vrt-admin/nonce?action=wp_vrt_toggle_item")
            .header("authorization", &format!("Bearer {KEY}"));
        let response = respond(&vrt, &request).unwrap();
        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        let nonce = body["nonce"].as_str().unwrap();
        assert!(Nonces::new(&vrt.config.nonce_secret).verify(nonce, "wp_vrt_toggle_item", "admin", Utc::now()));
    }

    #[test]
    fn catalog_overview_sections() {
        let vrt = admin_vrt();
        let overview = catalog_overview(&vrt);
        assert_eq!(overview.discovery_url, "http://localhost:8080/wp-json/wp-vrt/v1/discover");
        assert_eq!(overview.stats["Patterns"], 1);
        assert_eq!(overview.stats["Template Parts"], 1);
        let blocks = &overview.sections[0];
        assert!(blocks.items.iter().any(|i| i.label == "Quote - Plain" && i.url.ends_with("/block/core-quote/plain")));
        let media = blocks.groups.iter().find(|g| g.items.iter().any(|i| i.label == "Image"));
        assert!(media.is_some());
        assert_eq!(overview.sections[3].items[0].label, "Footer (footer)");
        assert_eq!(overview.sections[1].items[0].is_dynamic, Some(false));
        assert_eq!(overview.pattern_categories[0].title, "Banner");
        assert_eq!(overview.part_areas[0].members, ["footer"]);
    }

    #[test]
    fn catalog_requires_admin() {
        let vrt = admin_vrt();
        let response = respond(&vrt, &AdminRequest::new("GET", "/wp-vrt-admin/catalog")).unwrap();
        assert_eq!(response.status, 403);
        assert!(respond(&vrt, &AdminRequest::new("GET", "/wp-vrt-admin/unknown")).is_none());
        assert!(respond(&vrt, &AdminRequest::new("GET", "/elsewhere")).is_none());
    }
}
