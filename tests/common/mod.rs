//! Shared helpers: a fixture site and a preview server on an ephemeral port.

#![allow(dead_code)]

use std::sync::Arc;

use wp_vrt::host::{Host, MemoryOptions, MemorySite, OptionStore, PatternDef, SiteFixture, TemplateDef};
use wp_vrt::registry::SELF_TEST_CATEGORY;
use wp_vrt::server::VrtServer;
use wp_vrt::{Hooks, Vrt, VrtConfig};

pub const ADMIN_KEY: &str = "test-admin-key";

pub fn pattern(name: &str, title: &str, categories: &[&str], content: &str) -> PatternDef {
    PatternDef {
        name: name.into(),
        title: Some(title.into()),
        content: content.into(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn template(slug: &str, title: &str, area: Option<&str>, content: &str) -> TemplateDef {
    TemplateDef {
        slug: slug.into(),
        title: Some(title.into()),
        content: content.into(),
        area: area.map(String::from),
    }
}

/// A small site: two theme patterns, a self-test pattern, one template and
/// one header part.
pub fn site_fixture() -> SiteFixture {
    SiteFixture {
        patterns: vec![
            pattern("theme/hero", "Hero", &["banner"], "<!-- wp:paragraph --><p>Hero copy</p><!-- /wp:paragraph -->"),
            pattern("theme/latest", "Latest", &[], "<!-- wp:latest-posts /-->"),
            pattern(
                "wp-vrt/kitchen-sink",
                "Kitchen Sink",
                &[SELF_TEST_CATEGORY],
                "<!-- wp:paragraph --><p>Everything at once</p><!-- /wp:paragraph -->",
            ),
        ],
        templates: vec![template(
            "single",
            "Single",
            None,
            "<!-- wp:post-title {\"level\":1} /--><!-- wp:post-content /-->",
        )],
        template_parts: vec![template("header", "Header", Some("header"), "<!-- wp:site-title /-->")],
        ..Default::default()
    }
}

pub fn config() -> VrtConfig {
    let mut config = VrtConfig {
        home_url: String::new(),
        ..Default::default()
    };
    config.admin_keys.insert(ADMIN_KEY.into(), "admin".into());
    config
}

pub fn vrt(fixture: SiteFixture, hooks: Hooks, options: Arc<dyn OptionStore>) -> Vrt {
    let host = Host::from_site(Arc::new(MemorySite::from_fixture(fixture)), options);
    Vrt::new(host, hooks, config())
}

pub fn memory_vrt(fixture: SiteFixture, hooks: Hooks) -> Vrt {
    vrt(fixture, hooks, Arc::new(MemoryOptions::new()))
}

/// Start a server in the background and return its base URL.
pub fn start(vrt: Vrt) -> String {
    let server = VrtServer::bind(vrt, "127.0.0.1:0").expect("bind preview server");
    let addr = server.local_addr().expect("bound address");
    std::thread::spawn(move || server.run());
    format!("http://{addr}")
}

pub fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("http client")
}
