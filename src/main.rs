//! `wp-vrt` command line.
//!
//! - `serve` runs the preview server over a fixture site
//! - `snapshots` captures every discovered preview page as a PNG
//! - `test` captures snapshots and then runs an external test runner

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use wp_vrt::host::{Host, JsonFileOptions, MemoryOptions, MemorySite, OptionStore, SiteFixture};
use wp_vrt::registry::scenarios::register_fixture_scenarios;
use wp_vrt::server::VrtServer;
use wp_vrt::snapshots::{self, RunnerCommand, SnapshotOptions, SnapshotType};
use wp_vrt::{Hooks, UnitKind, Vrt, VrtConfig};

#[derive(Parser, Debug)]
#[command(name = "wp-vrt", version)]
#[command(about = "Preview pages and snapshots for visual regression testing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve preview pages, the discovery manifest and the admin endpoints
    Serve(ServeArgs),
    /// Capture a PNG for every discovered preview page
    Snapshots(SnapshotArgs),
    /// Capture snapshots, then run the test runner against them
    Test(TestArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Site fixture (JSON); an empty site with the core blocks when omitted
    #[arg(long, value_name = "PATH")]
    fixture: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Public home URL; defaults to the listen address
    #[arg(long)]
    home_url: Option<String>,

    /// Virtual route prefix
    #[arg(long, default_value = "wp-vrt")]
    prefix: String,

    /// Persist options (the disabled set) in this JSON file instead of memory
    #[arg(long, value_name = "PATH")]
    options_file: Option<PathBuf>,

    /// Content item dynamic blocks render against
    #[arg(long, value_name = "ID")]
    dynamic_item: Option<u64>,

    /// Admin bearer key, optionally `KEY=USER` (repeatable)
    #[arg(long = "admin-key", value_name = "KEY[=USER]")]
    admin_keys: Vec<String>,

    /// Secret for replay-protection tokens
    #[arg(long, default_value = "wp-vrt-local")]
    nonce_secret: String,

    /// Only these blocks are previewable (repeatable)
    #[arg(long = "allow-block", value_name = "NAME")]
    allow_blocks: Vec<String>,

    /// Additionally hide these blocks (repeatable)
    #[arg(long = "deny-block", value_name = "NAME")]
    deny_blocks: Vec<String>,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    /// Site to snapshot
    #[arg(long, default_value = "http://localhost:8080")]
    base_url: String,

    /// Output directory
    #[arg(long, value_name = "PATH")]
    dir: Option<PathBuf>,

    /// Unit types to capture
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_value = "blocks,patterns,templates,parts,scenarios"
    )]
    types: Vec<SnapshotType>,

    #[arg(long, default_value_t = 1200)]
    width: u32,

    #[arg(long, default_value_t = 800)]
    height: u32,

    /// Node binary running the screenshot script
    #[arg(long, default_value = "node")]
    node: String,

    /// Screenshot script
    #[arg(long, default_value = "assets/cli/screenshot.mjs")]
    script: PathBuf,

    /// Virtual route prefix of the site
    #[arg(long, default_value = "wp-vrt")]
    prefix: String,
}

impl SnapshotArgs {
    fn options(self) -> SnapshotOptions {
        let defaults = SnapshotOptions::default();
        SnapshotOptions {
            base_url: self.base_url,
            dir: self.dir.unwrap_or(defaults.dir),
            types: self.types,
            width: self.width,
            height: self.height,
            node: self.node,
            script: self.script,
            prefix: self.prefix,
        }
    }
}

#[derive(Args, Debug)]
struct TestArgs {
    #[command(flatten)]
    snapshots: SnapshotArgs,

    /// Test runner command line
    #[arg(long, default_value = "npm test")]
    runner: String,

    /// Working directory for the test runner
    #[arg(long, value_name = "PATH")]
    runner_dir: Option<PathBuf>,
}

fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let site = match &args.fixture {
        Some(path) => MemorySite::load(path).with_context(|| format!("loading fixture {}", path.display()))?,
        None => MemorySite::from_fixture(SiteFixture::default()),
    };
    let options: Arc<dyn OptionStore> = match &args.options_file {
        Some(path) => Arc::new(JsonFileOptions::new(path)),
        None => Arc::new(MemoryOptions::new()),
    };

    let mut hooks = Hooks::new();
    register_fixture_scenarios(&mut hooks, site.fixture_scenarios());

    let mut config = VrtConfig {
        prefix: args.prefix.trim_matches('/').to_string(),
        home_url: args.home_url.unwrap_or_default(),
        dynamic_item_id: args.dynamic_item,
        nonce_secret: args.nonce_secret,
        ..Default::default()
    };
    if !args.allow_blocks.is_empty() || !args.deny_blocks.is_empty() {
        let mut blocks = config.support_for(UnitKind::Block);
        blocks.allow.extend(args.allow_blocks);
        blocks.deny.extend(args.deny_blocks);
        config.support.insert(UnitKind::Block, blocks);
    }
    for entry in &args.admin_keys {
        let (key, user) = entry.split_once('=').unwrap_or((entry.as_str(), "admin"));
        if key.is_empty() {
            bail!("empty admin key in --admin-key {entry:?}");
        }
        config.admin_keys.insert(key.to_string(), user.to_string());
    }
    if config.admin_keys.is_empty() {
        warn!("no --admin-key given; admin endpoints will refuse every request");
    }

    let host = Host::from_site(Arc::new(site), options);
    let vrt = Vrt::new(host, hooks, config);
    let server = VrtServer::bind(vrt, &args.listen).with_context(|| format!("binding {}", args.listen))?;
    server.run();
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve(args),
        Command::Snapshots(args) => {
            let report = snapshots::generate_snapshots(&args.options())?;
            info!("{} saved, {} failed", report.saved.len(), report.failed.len());
            Ok(())
        }
        Command::Test(args) => {
            let mut runner = RunnerCommand::parse(&args.runner)?;
            runner.cwd = args.runner_dir;
            snapshots::run_tests(&args.snapshots.options(), &runner)?;
            info!("tests passed");
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e:#}");
        let code = match e.downcast_ref::<wp_vrt::Error>() {
            Some(wp_vrt::Error::UpstreamTool { code, .. }) if *code > 0 => *code,
            _ => 1,
        };
        std::process::exit(code);
    }
}
