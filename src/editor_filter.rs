//! Editor pattern listing.
//!
//! Self-test fragments exist only for the preview pipeline. When the block
//! editor asks for the pattern list (`/wp/v2/block-patterns/...` with
//! `context=edit`) they are dropped from the response so nobody inserts
//! them into real content.

use serde_json::{json, Value};

use crate::registry::SELF_TEST_CATEGORY;
use crate::router::{parse_target, Response};
use crate::Vrt;

/// REST namespace mount point.
pub const REST_PREFIX: &str = "/wp-json";

/// Route of the editor pattern listing, below [`REST_PREFIX`].
pub const PATTERNS_ROUTE: &str = "/wp/v2/block-patterns/patterns";

/// Whether a REST response for `route` in `context` gets filtered.
pub fn should_filter(route: &str, context: Option<&str>) -> bool {
    route.starts_with("/wp/v2/block-patterns") && context == Some("edit")
}

/// Drop self-test entries from a list response. Anything that is not a
/// list, and list entries without a category array, pass through.
pub fn filter_patterns(data: Value) -> Value {
    match data {
        Value::Array(entries) => Value::Array(entries.into_iter().filter(pattern_is_allowed).collect()),
        other => other,
    }
}

fn pattern_is_allowed(entry: &Value) -> bool {
    match entry.get("categories").and_then(Value::as_array) {
        Some(categories) => !categories.iter().any(|c| c.as_str() == Some(SELF_TEST_CATEGORY)),
        None => true,
    }
}

/// The host's pattern catalog as REST objects.
pub fn pattern_listing(vrt: &Vrt) -> Value {
    Value::Array(
        vrt.host
            .catalog
            .patterns()
            .into_iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "title": p.title.unwrap_or_else(|| p.name.clone()),
                    "content": p.content,
                    "categories": p.categories,
                })
            })
            .collect(),
    )
}

/// Serve the pattern listing route, filtered for the editor context.
pub fn respond(vrt: &Vrt, target: &str) -> Option<Response> {
    let url = parse_target(target)?;
    let route = url.path().strip_prefix(REST_PREFIX)?.trim_end_matches('/');
    if route != PATTERNS_ROUTE {
        return None;
    }
    let context = url
        .query_pairs()
        .find(|(k, _)| k == "context")
        .map(|(_, v)| v.into_owned());

    let mut data = pattern_listing(vrt);
    if should_filter(route, context.as_deref()) {
        data = filter_patterns(data);
    }
    Some(Response::json(200, &data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{PatternDef, SiteFixture};
    use crate::test_support::vrt_with;

    #[test]
    fn only_edit_context_on_pattern_routes_is_filtered() {
        assert!(should_filter("/wp/v2/block-patterns/patterns", Some("edit")));
        assert!(!should_filter("/wp/v2/block-patterns/patterns", Some("view")));
        assert!(!should_filter("/wp/v2/block-patterns/patterns", None));
        assert!(!should_filter("/wp/v2/posts", Some("edit")));
    }

    #[test]
    fn drops_self_test_entries_only() {
        let data = json!([
            { "name": "a", "categories": ["text"] },
            { "name": "b", "categories": [SELF_TEST_CATEGORY, "text"] },
            { "name": "c", "categories": "oops" },
            "not-an-object",
        ]);
        let names: Vec<Value> = filter_patterns(data)
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e.get("name").cloned().unwrap_or(Value::Null))
            .collect();
        assert_eq!(names, [json!("a"), json!("c"), Value::Null]);
        assert_eq!(filter_patterns(json!({ "a": 1 })), json!({ "a": 1 }));
    }

    #[test]
    fn serves_filtered_listing() {
        let vrt = vrt_with(SiteFixture {
            patterns: vec![
                PatternDef {
                    name: "theme/hero".into(),
                    content: "<p>hero</p>".into(),
                    categories: vec!["banner".into()],
                    ..Default::default()
                },
                PatternDef {
                    name: "wp-vrt/sink".into(),
                    content: "<p>sink</p>".into(),
                    categories: vec![SELF_TEST_CATEGORY.into()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        });
        let edit = respond(&vrt, "/wp-json/wp/v2/block-patterns/patterns?context=edit").unwrap();
        let listed: Value = serde_json::from_str(&edit.body).unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["title"], "theme/hero");

        let view = respond(&vrt, "/wp-json/wp/v2/block-patterns/patterns").unwrap();
        let listed: Value = serde_json::from_str(&view.body).unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 2);
        assert!(respond(&vrt, "/wp-json/wp/v2/posts").is_none());
    }
}
