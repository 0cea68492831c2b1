//! Snapshot generation and the test-runner command.
//!
//! [`generate_snapshots`] fetches the discovery manifest from a running
//! site, picks the requested unit types and runs the external screenshot
//! script once per preview URL:
//!
//! ```text
//! node screenshot.mjs <url> <output.png> <width> <height>
//! ```
//!
//! A failing capture is logged and skipped. [`run_tests`] generates the
//! snapshots and then hands the directory to an external test runner.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use log::{debug, info, warn};
use url::Url;

use crate::discovery::{Manifest, ManifestItems, DISCOVERY_PATH};
use crate::{Error, Result};

/// Unit groups the snapshot command can be limited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SnapshotType {
    Blocks,
    Patterns,
    Templates,
    Parts,
    Scenarios,
}

impl SnapshotType {
    pub const ALL: [SnapshotType; 5] = [
        SnapshotType::Blocks,
        SnapshotType::Patterns,
        SnapshotType::Templates,
        SnapshotType::Parts,
        SnapshotType::Scenarios,
    ];
}

#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub base_url: String,
    pub dir: PathBuf,
    pub types: Vec<SnapshotType>,
    pub width: u32,
    pub height: u32,
    /// Interpreter for the screenshot script
    pub node: String,
    pub script: PathBuf,
    /// Virtual route prefix the manifest URLs are under
    pub prefix: String,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            dir: std::env::temp_dir().join("wp-vrt-snapshots"),
            types: SnapshotType::ALL.to_vec(),
            width: 1200,
            height: 800,
            node: "node".to_string(),
            script: PathBuf::from("assets/cli/screenshot.mjs"),
            prefix: "wp-vrt".to_string(),
        }
    }
}

/// One capture to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotItem {
    /// Manifest URL, usually site-relative
    pub url: String,
    /// Output file stem
    pub name: String,
}

/// What a snapshot run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub saved: Vec<PathBuf>,
    /// URLs whose capture failed
    pub failed: Vec<String>,
}

/// Lowercase, runs of anything but `[a-z0-9]` become `-`, no leading or
/// trailing `-`.
pub fn snapshot_slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Join a manifest URL onto the base URL. Absolute URLs pass through; a
/// base already ending in `/{prefix}` is not repeated.
pub fn join_url(base_url: &str, path: &str, prefix: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let mut base = base_url.trim_end_matches('/');
    let suffix = format!("/{prefix}");
    if base.ends_with(&suffix) && path.starts_with(&format!("{suffix}/")) {
        base = &base[..base.len() - suffix.len()];
    }
    format!("{}{path}", base.trim_end_matches('/'))
}

/// Captures for the requested types, in manifest order.
pub fn collect_items(items: &ManifestItems, types: &[SnapshotType]) -> Vec<SnapshotItem> {
    let mut out = Vec::new();
    let mut push = |url: &str, name: String| {
        out.push(SnapshotItem {
            url: url.to_string(),
            name,
        })
    };

    if types.contains(&SnapshotType::Blocks) {
        for block in &items.blocks {
            push(&block.url, format!("block-{}", snapshot_slug(&block.name)));
            for variation in &block.variations {
                push(
                    &variation.url,
                    format!("block-{}", snapshot_slug(&format!("{}-{}", block.name, variation.name))),
                );
            }
        }
    }
    if types.contains(&SnapshotType::Patterns) {
        for pattern in &items.patterns {
            push(&pattern.url, format!("pattern-{}", snapshot_slug(&pattern.name)));
        }
    }
    if types.contains(&SnapshotType::Templates) {
        for template in &items.templates {
            push(&template.url, format!("template-{}", snapshot_slug(&template.slug)));
        }
    }
    if types.contains(&SnapshotType::Parts) {
        for part in &items.template_parts {
            push(&part.url, format!("part-{}", snapshot_slug(&part.slug)));
        }
    }
    if types.contains(&SnapshotType::Scenarios) {
        for scenario in &items.scenarios {
            push(&scenario.url, format!("scenario-{}", snapshot_slug(&scenario.slug)));
        }
    }
    out
}

fn get_manifest(client: &reqwest::blocking::Client, endpoint: &str) -> std::result::Result<Manifest, String> {
    let response = client.get(endpoint).send().map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }
    let body = response.text().map_err(|e| e.to_string())?;
    serde_json::from_str(&body).map_err(|e| format!("Invalid JSON from discovery endpoint: {e}"))
}

/// Fetch the discovery manifest. An `https` base that cannot be reached is
/// retried once over plain `http`.
pub fn fetch_manifest(base_url: &str) -> Result<Manifest> {
    let endpoint = format!("{}{DISCOVERY_PATH}", base_url.trim_end_matches('/'));
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| Error::UpstreamFetch(e.to_string()))?;

    match get_manifest(&client, &endpoint) {
        Ok(manifest) => Ok(manifest),
        Err(first) => {
            let mut url = Url::parse(&endpoint).map_err(|e| Error::UpstreamFetch(format!("{endpoint}: {e}")))?;
            if url.scheme() != "https" || url.set_scheme("http").is_err() {
                return Err(Error::UpstreamFetch(format!("{endpoint}: {first}")));
            }
            warn!("HTTPS failed, retrying over HTTP: {url}");
            get_manifest(&client, url.as_str()).map_err(|e| Error::UpstreamFetch(format!("{url}: {e}")))
        }
    }
}

/// Run `program args...`, mapping a non-zero exit to [`Error::UpstreamTool`].
fn run_tool(mut command: Command, tool: &str) -> Result<()> {
    let output = command.stdin(Stdio::null()).output()?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        debug!("{tool} stderr: {}", stderr.trim());
    }
    Err(Error::UpstreamTool {
        tool: tool.to_string(),
        code: output.status.code().unwrap_or(-1),
    })
}

fn capture(options: &SnapshotOptions, url: &str, path: &Path) -> Result<()> {
    let mut command = Command::new(&options.node);
    command
        .arg(&options.script)
        .arg(url)
        .arg(path)
        .arg(options.width.to_string())
        .arg(options.height.to_string());
    run_tool(command, &options.node)
}

/// Capture every requested unit of the site at `options.base_url`.
pub fn generate_snapshots(options: &SnapshotOptions) -> Result<SnapshotReport> {
    if !options.script.is_file() {
        return Err(Error::Config(format!(
            "Missing screenshot script at {}",
            options.script.display()
        )));
    }
    std::fs::create_dir_all(&options.dir)
        .map_err(|e| Error::Config(format!("Failed to create snapshot directory {}: {e}", options.dir.display())))?;

    let manifest = fetch_manifest(&options.base_url)?;
    let base_url = if manifest.base_url.is_empty() {
        options.base_url.clone()
    } else {
        manifest.base_url.clone()
    };

    let items = collect_items(&manifest.items, &options.types);
    let mut report = SnapshotReport::default();
    if items.is_empty() {
        warn!("No items found to snapshot.");
        return Ok(report);
    }

    info!("Saving snapshots to {}", options.dir.display());
    for item in items {
        let url = join_url(&base_url, &item.url, &options.prefix);
        let path = options.dir.join(format!("{}.png", item.name));
        match capture(options, &url, &path) {
            Ok(()) => {
                info!("Saved: {}", path.display());
                report.saved.push(path);
            }
            Err(e) => {
                warn!("Failed: {url} ({e})");
                report.failed.push(url);
            }
        }
    }
    Ok(report)
}

/// External test runner invoked after snapshot generation.
#[derive(Debug, Clone)]
pub struct RunnerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl RunnerCommand {
    /// Split a command line on whitespace.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(String::from);
        let program = words
            .next()
            .ok_or_else(|| Error::Validation("Missing test runner command".into()))?;
        Ok(Self {
            program,
            args: words.collect(),
            cwd: None,
        })
    }
}

/// Generate snapshots, then run the test runner against them. The
/// runner's failure is the command's failure.
pub fn run_tests(options: &SnapshotOptions, runner: &RunnerCommand) -> Result<SnapshotReport> {
    info!("Generating snapshots...");
    let report = generate_snapshots(options)?;

    let mut command = Command::new(&runner.program);
    command
        .args(&runner.args)
        .env("WP_VRT_BASE_URL", &options.base_url)
        .env("WP_VRT_SNAPSHOT_DIR", &options.dir)
        .env("NODE_BINARY", &options.node);
    if let Some(cwd) = &runner.cwd {
        command.current_dir(cwd);
    }
    info!("Running tests: {} {}", runner.program, runner.args.join(" "));
    run_tool(command, &runner.program)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{BlockEntry, PatternEntry, ScenarioEntry, TemplatePartEntry, VariationEntry};

    #[test]
    fn slugs_collapse_separators() {
        assert_eq!(snapshot_slug("core/quote"), "core-quote");
        assert_eq!(snapshot_slug("--Core/Quote--Plain!!"), "core-quote-plain");
        assert_eq!(snapshot_slug("///"), "");
    }

    #[test]
    fn join_drops_duplicated_prefix() {
        assert_eq!(
            join_url("http://site.test/wp-vrt/", "/wp-vrt/block/core-quote", "wp-vrt"),
            "http://site.test/wp-vrt/block/core-quote"
        );
        assert_eq!(
            join_url("http://site.test", "/wp-vrt/block/core-quote", "wp-vrt"),
            "http://site.test/wp-vrt/block/core-quote"
        );
        assert_eq!(join_url("http://a.test", "https://b.test/x", "wp-vrt"), "https://b.test/x");
    }

    #[test]
    fn collects_requested_types_in_order() {
        let items = ManifestItems {
            blocks: vec![BlockEntry {
                name: "core/quote".into(),
                url: "/wp-vrt/block/core-quote".into(),
                variations: vec![VariationEntry {
                    name: "plain".into(),
                    label: "Plain".into(),
                    url: "/wp-vrt/block/core-quote/plain".into(),
                }],
                ..Default::default()
            }],
            patterns: vec![PatternEntry {
                name: "theme/hero".into(),
                url: "/wp-vrt/pattern/theme-hero".into(),
                ..Default::default()
            }],
            template_parts: vec![TemplatePartEntry {
                slug: "header".into(),
                url: "/wp-vrt/template-part/header".into(),
                ..Default::default()
            }],
            scenarios: vec![ScenarioEntry {
                slug: "empty-cart".into(),
                url: "/wp-vrt/scenario/empty-cart".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let names: Vec<String> = collect_items(&items, &SnapshotType::ALL).into_iter().map(|i| i.name).collect();
        assert_eq!(
            names,
            ["block-core-quote", "block-core-quote-plain", "pattern-theme-hero", "part-header", "scenario-empty-cart"]
        );
        let parts = collect_items(&items, &[SnapshotType::Parts]);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].url, "/wp-vrt/template-part/header");
    }

    #[test]
    fn runner_command_line_splits() {
        let runner = RunnerCommand::parse("npx playwright test").unwrap();
        assert_eq!(runner.program, "npx");
        assert_eq!(runner.args, ["playwright", "test"]);
        assert!(RunnerCommand::parse("  ").is_err());
    }

    #[test]
    fn missing_script_is_a_config_error() {
        let options = SnapshotOptions {
            script: PathBuf::from("/definitely/not/here.mjs"),
            ..Default::default()
        };
        assert!(matches!(generate_snapshots(&options), Err(Error::Config(_))));
    }

    #[test]
    fn unreachable_site_is_a_fetch_error() {
        let err = fetch_manifest("http://127.0.0.1:9").unwrap_err();
        assert!(matches!(err, Error::UpstreamFetch(_)));
    }
}
