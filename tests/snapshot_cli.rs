//! Snapshot generation and the test command, with shell stubs standing in
//! for the screenshot script and the test runner.

#![cfg(unix)]

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use common::{memory_vrt, site_fixture, start};
use wp_vrt::registry::scenarios::{ScenarioContent, ScenarioDef};
use wp_vrt::snapshots::{generate_snapshots, run_tests, RunnerCommand, SnapshotOptions, SnapshotType};
use wp_vrt::{Error, Hooks};

/// Writes its arguments into the output file; fails for URLs containing
/// `fail`.
const SCREENSHOT_STUB: &str = r#"case "$1" in *fail*) echo "cannot load $1" >&2; exit 7;; esac
printf '%s %s %s\n' "$1" "$3" "$4" > "$2"
"#;

/// Records the environment it was given and exits with `$2`.
const RUNNER_STUB: &str = r#"printf '%s\n%s\n%s\n' "$WP_VRT_BASE_URL" "$WP_VRT_SNAPSHOT_DIR" "$NODE_BINARY" > "$1"
exit "$2"
"#;

fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn site() -> String {
    let mut hooks = Hooks::new();
    hooks.register_scenarios.add(|mut list, _| {
        list.push(ScenarioDef::new("will-fail", ScenarioContent::Static("<p>broken</p>".into())));
        list
    });
    start(memory_vrt(site_fixture(), hooks))
}

fn options(base_url: &str, work: &Path) -> SnapshotOptions {
    SnapshotOptions {
        base_url: base_url.to_string(),
        dir: work.join("shots"),
        types: vec![SnapshotType::Patterns, SnapshotType::Parts, SnapshotType::Scenarios],
        width: 640,
        height: 480,
        node: "sh".into(),
        script: write_stub(work, "screenshot.sh", SCREENSHOT_STUB),
        ..Default::default()
    }
}

fn saved_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn captures_every_discovered_unit_and_skips_failures() {
    let base = site();
    let work = tempfile::tempdir().unwrap();
    let options = options(&base, work.path());

    let report = generate_snapshots(&options).unwrap();
    assert_eq!(
        saved_names(&options.dir),
        [
            "part-header.png",
            "pattern-theme-hero.png",
            "pattern-theme-latest.png",
            "scenario-wp-vrt-kitchen-sink.png",
        ]
    );
    assert_eq!(report.saved.len(), 4);
    assert_eq!(report.failed, [format!("{base}/wp-vrt/scenario/will-fail")]);

    let written = fs::read_to_string(options.dir.join("pattern-theme-hero.png")).unwrap();
    assert_eq!(written.trim(), format!("{base}/wp-vrt/pattern/theme-hero 640 480"));
    let sink = fs::read_to_string(options.dir.join("scenario-wp-vrt-kitchen-sink.png")).unwrap();
    assert!(sink.starts_with(&format!("{base}/wp-vrt/pattern/wp-vrt-kitchen-sink ")));
}

#[test]
fn https_base_falls_back_to_http() {
    let base = site();
    let work = tempfile::tempdir().unwrap();
    let mut options = options(&base.replacen("http://", "https://", 1), work.path());
    options.types = vec![SnapshotType::Parts];

    let report = generate_snapshots(&options).unwrap();
    assert_eq!(saved_names(&options.dir), ["part-header.png"]);
    assert!(report.failed.is_empty());
}

#[test]
fn runner_exit_code_is_the_result() {
    let base = site();
    let work = tempfile::tempdir().unwrap();
    let mut options = options(&base, work.path());
    options.types = vec![SnapshotType::Parts];
    let runner_script = write_stub(work.path(), "runner.sh", RUNNER_STUB);
    let log = work.path().join("runner.log");
    let runner = |code: &str| RunnerCommand {
        program: "sh".into(),
        args: vec![runner_script.display().to_string(), log.display().to_string(), code.into()],
        cwd: Some(work.path().to_path_buf()),
    };

    let report = run_tests(&options, &runner("0")).unwrap();
    assert_eq!(report.saved.len(), 1);
    let env = fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = env.lines().collect();
    let dir = options.dir.display().to_string();
    assert_eq!(lines, [base.as_str(), dir.as_str(), "sh"]);

    let err = run_tests(&options, &runner("3")).unwrap_err();
    assert!(matches!(err, Error::UpstreamTool { code: 3, .. }), "{err}");
}

#[test]
fn unreachable_site_fails_before_capturing() {
    let work = tempfile::tempdir().unwrap();
    let options = options("http://127.0.0.1:9", work.path());
    assert!(matches!(generate_snapshots(&options), Err(Error::UpstreamFetch(_))));
}

#[test]
fn binary_propagates_runner_exit_code() {
    let base = site();
    let work = tempfile::tempdir().unwrap();
    let script = write_stub(work.path(), "screenshot.sh", SCREENSHOT_STUB);
    let runner_script = write_stub(work.path(), "runner.sh", RUNNER_STUB);
    let shots = work.path().join("shots");

    let status = Command::new(env!("CARGO_BIN_EXE_wp-vrt"))
        .args(["test", "--base-url", &base, "--types", "parts", "--node", "sh"])
        .arg("--script")
        .arg(&script)
        .arg("--dir")
        .arg(&shots)
        .arg("--runner")
        .arg(format!("sh {} {} 5", runner_script.display(), work.path().join("runner.log").display()))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(5));
    assert!(shots.join("part-header.png").is_file());

    let status = Command::new(env!("CARGO_BIN_EXE_wp-vrt"))
        .args(["snapshots", "--base-url", &base, "--types", "patterns", "--node", "sh"])
        .arg("--script")
        .arg(&script)
        .arg("--dir")
        .arg(&shots)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(shots.join("pattern-theme-hero.png").is_file());
}
