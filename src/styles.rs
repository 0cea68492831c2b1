//! Style collection.
//!
//! A preview page inlines every stylesheet the live site would load, as
//! five layers in cascade order:
//!
//! 1. `theme-json-variables`: preset and custom properties plus preset
//!    utility classes, generated from the theme's design configuration
//! 2. `global-styles`: element and block rules from the same configuration
//! 3. `block-library`: the host's block stylesheet bundle
//! 4. `theme-stylesheet`: the theme's `style.css`, verbatim
//! 5. `block-specific`: inline styles registered by individual blocks
//!
//! Empty layers are skipped by the renderer.

use std::fs;

use log::warn;
use serde_json::{Map, Value};

use crate::hooks::Hooks;
use crate::host::{SiteCatalog, ThemeSource};

/// One stylesheet layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleLayer {
    ThemeJsonVariables,
    GlobalStyles,
    BlockLibrary,
    ThemeStylesheet,
    BlockSpecific,
}

impl StyleLayer {
    /// Cascade order.
    pub const ORDER: [StyleLayer; 5] = [
        StyleLayer::ThemeJsonVariables,
        StyleLayer::GlobalStyles,
        StyleLayer::BlockLibrary,
        StyleLayer::ThemeStylesheet,
        StyleLayer::BlockSpecific,
    ];

    pub fn id(self) -> &'static str {
        match self {
            StyleLayer::ThemeJsonVariables => "theme-json-variables",
            StyleLayer::GlobalStyles => "global-styles",
            StyleLayer::BlockLibrary => "block-library",
            StyleLayer::ThemeStylesheet => "theme-stylesheet",
            StyleLayer::BlockSpecific => "block-specific",
        }
    }
}

/// A non-empty layer ready to be inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleBlock {
    pub layer: StyleLayer,
    pub css: String,
}

/// All five layers. Any of them may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedStyles {
    pub theme_json_variables: String,
    pub global_styles: String,
    pub block_library: String,
    pub theme_stylesheet: String,
    pub block_specific: String,
}

impl CollectedStyles {
    pub fn get(&self, layer: StyleLayer) -> &str {
        match layer {
            StyleLayer::ThemeJsonVariables => &self.theme_json_variables,
            StyleLayer::GlobalStyles => &self.global_styles,
            StyleLayer::BlockLibrary => &self.block_library,
            StyleLayer::ThemeStylesheet => &self.theme_stylesheet,
            StyleLayer::BlockSpecific => &self.block_specific,
        }
    }

    pub fn get_mut(&mut self, layer: StyleLayer) -> &mut String {
        match layer {
            StyleLayer::ThemeJsonVariables => &mut self.theme_json_variables,
            StyleLayer::GlobalStyles => &mut self.global_styles,
            StyleLayer::BlockLibrary => &mut self.block_library,
            StyleLayer::ThemeStylesheet => &mut self.theme_stylesheet,
            StyleLayer::BlockSpecific => &mut self.block_specific,
        }
    }

    /// Non-empty layers in cascade order.
    pub fn blocks(&self) -> Vec<StyleBlock> {
        StyleLayer::ORDER
            .into_iter()
            .filter(|layer| !self.get(*layer).trim().is_empty())
            .map(|layer| StyleBlock {
                layer,
                css: self.get(layer).to_string(),
            })
            .collect()
    }
}

/// Gathers the layered stylesheets of the active theme.
pub struct StyleCollector<'a> {
    theme: &'a dyn ThemeSource,
    catalog: &'a dyn SiteCatalog,
    hooks: &'a Hooks,
}

impl<'a> StyleCollector<'a> {
    pub fn new(theme: &'a dyn ThemeSource, catalog: &'a dyn SiteCatalog, hooks: &'a Hooks) -> Self {
        Self { theme, catalog, hooks }
    }

    pub fn collect(&self) -> CollectedStyles {
        let design = self.theme.design_config();
        let mut styles = CollectedStyles::default();
        if let Some(design) = design.as_ref() {
            styles.theme_json_variables = variables_css(design);
            styles.global_styles = global_styles_css(design);
        }
        styles.block_library = self.theme.block_library_css();
        styles.theme_stylesheet = self.theme_stylesheet();
        styles.block_specific = self
            .catalog
            .block_types()
            .into_iter()
            .filter_map(|t| t.style.filter(|css| !css.trim().is_empty()))
            .collect::<Vec<_>>()
            .join("\n");
        self.hooks.collected_styles.apply(styles, &())
    }

    fn theme_stylesheet(&self) -> String {
        let Some(path) = self.theme.stylesheet_path() else {
            return String::new();
        };
        if !path.exists() {
            return String::new();
        }
        fs::read_to_string(&path).unwrap_or_else(|e| {
            warn!("could not read theme stylesheet {}: {e}", path.display());
            String::new()
        })
    }
}

/// Preset families: (settings path, item value key, preset name).
const PRESETS: [(&[&str], &str, &str); 6] = [
    (&["color", "palette"], "color", "color"),
    (&["color", "gradients"], "gradient", "gradient"),
    (&["typography", "fontSizes"], "size", "font-size"),
    (&["typography", "fontFamilies"], "fontFamily", "font-family"),
    (&["spacing", "spacingSizes"], "size", "spacing"),
    (&["shadow", "presets"], "shadow", "shadow"),
];

fn lookup<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

/// Preset entries of one family. Accepts a plain list or an object of
/// origin lists (`default`, `theme`, `custom`), later origins winning.
fn preset_entries<'v>(value: &'v Value) -> Vec<&'v Map<String, Value>> {
    let lists: Vec<&Vec<Value>> = match value {
        Value::Array(list) => vec![list],
        Value::Object(origins) => ["default", "theme", "custom"]
            .iter()
            .filter_map(|o| origins.get(*o).and_then(Value::as_array))
            .collect(),
        _ => Vec::new(),
    };
    let mut entries: Vec<&Map<String, Value>> = Vec::new();
    for entry in lists.into_iter().flatten().filter_map(Value::as_object) {
        let slug = entry.get("slug").and_then(Value::as_str);
        match entries.iter_mut().find(|e| e.get("slug").and_then(Value::as_str) == slug) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }
    entries
}

fn css_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(resolve_var_ref(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `var:preset|color|primary` -> `var(--wp--preset--color--primary)`.
pub fn resolve_var_ref(value: &str) -> String {
    match value.strip_prefix("var:") {
        Some(reference) => format!("var(--wp--{})", reference.replace('|', "--")),
        None => value.to_string(),
    }
}

/// `fontSize` -> `font-size`, `line_height` -> `line-height`.
pub fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else if ch == '_' || ch == ' ' {
            out.push('-');
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

fn rule(selector: &str, declarations: &[(String, String)]) -> String {
    if declarations.is_empty() {
        return String::new();
    }
    let body: String = declarations.iter().map(|(p, v)| format!("{p}: {v};")).collect();
    format!("{selector}{{{body}}}")
}

fn custom_properties(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                custom_properties(&format!("{prefix}--{}", kebab_case(key)), child, out);
            }
        }
        other => {
            if let Some(v) = css_value(other) {
                out.push((prefix.to_string(), v));
            }
        }
    }
}

/// Preset and custom properties on `:root`, then preset utility classes.
pub fn variables_css(design: &Value) -> String {
    let Some(settings) = design.get("settings") else {
        return String::new();
    };
    let mut vars: Vec<(String, String)> = Vec::new();
    let mut classes: Vec<String> = Vec::new();

    for (path, value_key, preset) in PRESETS {
        let Some(family) = lookup(settings, path) else { continue };
        for entry in preset_entries(family) {
            let (Some(slug), Some(value)) = (
                entry.get("slug").and_then(Value::as_str),
                entry.get(value_key).and_then(css_value),
            ) else {
                continue;
            };
            let var = format!("--wp--preset--{preset}--{}", kebab_case(slug));
            vars.push((var.clone(), value));
            let slug = kebab_case(slug);
            match preset {
                "color" => {
                    classes.push(format!(".has-{slug}-color{{color: var({var}) !important;}}"));
                    classes.push(format!(".has-{slug}-background-color{{background-color: var({var}) !important;}}"));
                    classes.push(format!(".has-{slug}-border-color{{border-color: var({var}) !important;}}"));
                }
                "gradient" => {
                    classes.push(format!(".has-{slug}-gradient-background{{background: var({var}) !important;}}"));
                }
                "font-size" => {
                    classes.push(format!(".has-{slug}-font-size{{font-size: var({var}) !important;}}"));
                }
                "font-family" => {
                    classes.push(format!(".has-{slug}-font-family{{font-family: var({var}) !important;}}"));
                }
                _ => {}
            }
        }
    }
    if let Some(custom) = settings.get("custom") {
        custom_properties("--wp--custom", custom, &mut vars);
    }

    let mut css = rule(":root", &vars);
    for class in classes {
        css.push_str(&class);
    }
    css
}

/// Declarations for one style object (`color`, `typography`, `spacing`,
/// `border`, `dimensions`).
fn declarations(style: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut push = |prop: &str, value: Option<&Value>| {
        if let Some(v) = value.and_then(css_value) {
            out.push((prop.to_string(), v));
        }
    };

    push("color", lookup(style, &["color", "text"]));
    push("background-color", lookup(style, &["color", "background"]));
    push("background", lookup(style, &["color", "gradient"]));

    if let Some(Value::Object(typography)) = style.get("typography") {
        for (key, value) in typography {
            push(&kebab_case(key), Some(value));
        }
    }

    for side_prop in ["padding", "margin"] {
        match lookup(style, &["spacing", side_prop]) {
            Some(Value::Object(sides)) => {
                for side in ["top", "right", "bottom", "left"] {
                    push(&format!("{side_prop}-{side}"), sides.get(side));
                }
            }
            other => push(side_prop, other),
        }
    }

    if let Some(Value::Object(border)) = style.get("border") {
        for key in ["color", "width", "style", "radius"] {
            push(&format!("border-{key}"), border.get(key));
        }
    }
    push("min-height", lookup(style, &["dimensions", "minHeight"]));
    out
}

fn element_selector(element: &str) -> Option<&'static str> {
    Some(match element {
        "link" => "a:where(:not(.wp-element-button))",
        "button" => ".wp-element-button, .wp-block-button__link",
        "heading" => "h1, h2, h3, h4, h5, h6",
        "h1" => "h1",
        "h2" => "h2",
        "h3" => "h3",
        "h4" => "h4",
        "h5" => "h5",
        "h6" => "h6",
        "caption" => ".wp-element-caption, .wp-block-audio figcaption, .wp-block-embed figcaption, .wp-block-image figcaption, .wp-block-table figcaption, .wp-block-video figcaption",
        "cite" => "cite",
        _ => return None,
    })
}

/// `core/quote` -> `.wp-block-quote`, `acme/card` -> `.wp-block-acme-card`.
fn block_selector(name: &str) -> String {
    match name.strip_prefix("core/") {
        Some(short) => format!(".wp-block-{short}"),
        None => format!(".wp-block-{}", name.replace('/', "-")),
    }
}

fn element_rules(scope: Option<&str>, elements: &Map<String, Value>, css: &mut String) {
    for (element, style) in elements {
        let Some(selector) = element_selector(element) else { continue };
        let scoped = |suffix: &str| -> String {
            selector
                .split(", ")
                .map(|s| match scope {
                    Some(scope) => format!("{scope} {s}{suffix}"),
                    None => format!("{s}{suffix}"),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        css.push_str(&rule(&scoped(""), &declarations(style)));
        for pseudo in [":hover", ":focus", ":active", ":visited"] {
            if let Some(state) = style.get(pseudo) {
                css.push_str(&rule(&scoped(pseudo), &declarations(state)));
            }
        }
    }
}

/// Root, element and block rules from the design configuration's `styles`.
pub fn global_styles_css(design: &Value) -> String {
    let Some(styles) = design.get("styles") else {
        return String::new();
    };
    let mut css = rule("body", &declarations(styles));

    if let Some(Value::Object(elements)) = styles.get("elements") {
        element_rules(None, elements, &mut css);
    }
    if let Some(Value::Object(blocks)) = styles.get("blocks") {
        for (name, style) in blocks {
            let selector = block_selector(name);
            css.push_str(&rule(&selector, &declarations(style)));
            if let Some(Value::Object(elements)) = style.get("elements") {
                element_rules(Some(&selector), elements, &mut css);
            }
            if let Some(extra) = style.get("css").and_then(Value::as_str) {
                css.push_str(&extra.replace('&', &selector));
            }
        }
    }
    if let Some(extra) = styles.get("css").and_then(Value::as_str) {
        css.push_str(extra);
    }
    css
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BlockType, MemorySite, SiteFixture};
    use crate::host::memory::ThemeFixture;
    use serde_json::json;

    fn design() -> Value {
        json!({
            "settings": {
                "color": {"palette": [
                    {"slug": "primary", "color": "#0a0a0a", "name": "Primary"},
                    {"slug": "accentTwo", "color": "#ff0", "name": "Accent"}
                ]},
                "typography": {"fontSizes": [{"slug": "small", "size": "13px"}]},
                "custom": {"lineHeight": {"body": 1.6}}
            },
            "styles": {
                "color": {"background": "var:preset|color|primary"},
                "spacing": {"padding": {"top": "1rem"}},
                "elements": {"link": {"color": {"text": "#00f"}, ":hover": {"color": {"text": "#f00"}}}},
                "blocks": {"core/quote": {"border": {"width": "2px"}}}
            }
        })
    }

    #[test]
    fn generates_preset_properties_and_classes() {
        let css = variables_css(&design());
        assert!(css.starts_with(":root{--wp--preset--color--primary: #0a0a0a;"));
        assert!(css.contains("--wp--preset--color--accent-two: #ff0;"));
        assert!(css.contains("--wp--preset--font-size--small: 13px;"));
        assert!(css.contains("--wp--custom--line-height--body: 1.6;"));
        assert!(css.contains(".has-primary-background-color{background-color: var(--wp--preset--color--primary) !important;}"));
        assert!(css.contains(".has-small-font-size{font-size: var(--wp--preset--font-size--small) !important;}"));
    }

    #[test]
    fn generates_root_element_and_block_rules() {
        let css = global_styles_css(&design());
        assert!(css.starts_with("body{background-color: var(--wp--preset--color--primary);padding-top: 1rem;}"));
        assert!(css.contains("a:where(:not(.wp-element-button)){color: #00f;}"));
        assert!(css.contains("a:where(:not(.wp-element-button)):hover{color: #f00;}"));
        assert!(css.contains(".wp-block-quote{border-width: 2px;}"));
    }

    #[test]
    fn layers_are_ordered_and_empty_ones_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("style.css"), "body { margin: 0; }").unwrap();
        let site = MemorySite::from_fixture(SiteFixture {
            skip_core_blocks: true,
            block_types: vec![BlockType {
                name: "acme/card".into(),
                style: Some(".wp-block-acme-card{padding:1em}".into()),
                ..Default::default()
            }],
            theme: ThemeFixture {
                design: Some(design()),
                stylesheet_dir: Some(dir.path().to_path_buf()),
                block_library_css: String::new(),
            },
            ..Default::default()
        });
        let hooks = Hooks::new();
        let styles = StyleCollector::new(&site, &site, &hooks).collect();
        let ids: Vec<&str> = styles.blocks().iter().map(|b| b.layer.id()).collect();
        assert_eq!(ids, ["theme-json-variables", "global-styles", "theme-stylesheet", "block-specific"]);
        assert_eq!(styles.theme_stylesheet, "body { margin: 0; }");
    }

    #[test]
    fn hook_post_processes_layers() {
        let site = MemorySite::from_fixture(SiteFixture::default());
        let mut hooks = Hooks::new();
        hooks.collected_styles.add(|mut styles, _| {
            styles.get_mut(StyleLayer::BlockLibrary).push_str(".extra{}");
            styles
        });
        let styles = StyleCollector::new(&site, &site, &hooks).collect();
        assert_eq!(styles.blocks().len(), 1);
        assert_eq!(styles.block_library, ".extra{}");
    }

    #[test]
    fn var_refs_and_keys_convert() {
        assert_eq!(resolve_var_ref("var:preset|spacing|40"), "var(--wp--preset--spacing--40)");
        assert_eq!(resolve_var_ref("12px"), "12px");
        assert_eq!(kebab_case("fontSize"), "font-size");
        assert_eq!(kebab_case("line_height"), "line-height");
    }
}
