//! WP VRT
//!
//! Isolated, deterministic preview pages for every renderable unit of a
//! block-based site: blocks, patterns, templates, template parts and
//! registered scenarios. Each unit gets a stable URL below a virtual prefix;
//! a discovery manifest lists them so an external screenshot tool can
//! capture and diff them.
//!
//! # Features
//!
//! - **Registries**: one per unit kind, with a support policy and a
//!   persisted disabled set
//! - **Sample content**: blocks without content of their own get
//!   representative sample markup
//! - **Dynamic context**: live-data blocks render against a real or
//!   throwaway content item, torn down after every render
//! - **Hooks**: ordered filter chains at every extension point
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wp_vrt::host::{Host, MemoryOptions, MemorySite, SiteFixture};
//! use wp_vrt::{Hooks, RenderContext, Router, Vrt, VrtConfig};
//!
//! let site = Arc::new(MemorySite::from_fixture(SiteFixture::default()));
//! let host = Host::from_site(site, Arc::new(MemoryOptions::new()));
//! let vrt = Vrt::new(host, Hooks::new(), VrtConfig::default());
//!
//! let mut ctx = RenderContext::new();
//! let response = Router::new(&vrt)
//!     .respond(&mut ctx, "/wp-vrt/block/core-paragraph")
//!     .expect("virtual page route");
//! assert_eq!(response.status, 200);
//! ```

use std::collections::BTreeMap;

use log::warn;

pub mod admin;
pub mod blocks;
pub mod discovery;
pub mod dynamic;
pub mod editor_filter;
pub mod error;
pub mod hooks;
pub mod host;
pub mod registry;
pub mod render;
pub mod router;
pub mod sample;
pub mod server;
pub mod snapshots;
pub mod styles;

pub use dynamic::RenderContext;
pub use error::{Error, Result};
pub use hooks::Hooks;
pub use host::{Host, NewItem};
pub use registry::{DisabledSet, Registries, Registry, RenderableUnit, SupportPolicy, UnitKind};
pub use render::Renderer;
pub use router::{Response, RouteRequest, Router};

/// Social networks with a `core/social-link-*` block.
const SOCIAL_LINK_SERVICES: [&str; 39] = [
    "amazon",
    "bandcamp",
    "behance",
    "chain",
    "codepen",
    "deviantart",
    "dribbble",
    "dropbox",
    "etsy",
    "facebook",
    "feed",
    "fivehundredpx",
    "flickr",
    "foursquare",
    "goodreads",
    "google",
    "github",
    "instagram",
    "lastfm",
    "linkedin",
    "mail",
    "mastodon",
    "meetup",
    "medium",
    "pinterest",
    "pocket",
    "reddit",
    "skype",
    "snapchat",
    "soundcloud",
    "spotify",
    "tumblr",
    "twitch",
    "twitter",
    "vimeo",
    "vk",
    "wordpress",
    "yelp",
    "youtube",
];

/// Blocks that cannot be previewed in isolation.
pub fn default_block_denylist() -> Vec<String> {
    SOCIAL_LINK_SERVICES
        .iter()
        .map(|s| format!("core/social-link-{s}"))
        .chain(["core/template-part", "core/pattern", "core/widget-group"].map(String::from))
        .collect()
}

/// Pipeline configuration
///
/// The defaults match a local development site at `http://localhost:8080`
/// with the preview pages mounted under `/wp-vrt`.
///
/// # Examples
///
/// ```
/// let cfg = wp_vrt::VrtConfig::default();
/// assert_eq!(cfg.prefix, "wp-vrt");
/// assert!(!cfg.support_for(wp_vrt::UnitKind::Block).supports("core/pattern"));
/// ```
#[derive(Debug, Clone)]
pub struct VrtConfig {
    /// Virtual route prefix, without slashes
    pub prefix: String,
    /// Site home URL, without a trailing slash
    pub home_url: String,
    /// Per-kind allow/deny lists
    pub support: BTreeMap<UnitKind, SupportPolicy>,
    /// Item dynamic blocks render against, when set
    pub dynamic_item_id: Option<u64>,
    /// Template for the throwaway item created when no item exists
    pub fallback_item: NewItem,
    /// Secret mixed into replay-protection tokens
    pub nonce_secret: String,
    /// Bearer key -> user login holding the admin capability
    pub admin_keys: BTreeMap<String, String>,
    /// Option key of the persisted disabled set
    pub disabled_option_key: String,
}

impl Default for VrtConfig {
    fn default() -> Self {
        let mut support = BTreeMap::new();
        support.insert(UnitKind::Block, SupportPolicy::deny(default_block_denylist()));
        Self {
            prefix: "wp-vrt".to_string(),
            home_url: "http://localhost:8080".to_string(),
            support,
            dynamic_item_id: None,
            fallback_item: NewItem::default(),
            nonce_secret: "wp-vrt-local".to_string(),
            admin_keys: BTreeMap::new(),
            disabled_option_key: "wp_vrt_disabled_items".to_string(),
        }
    }
}

impl VrtConfig {
    /// Support policy for one kind; kinds without one support everything.
    pub fn support_for(&self, kind: UnitKind) -> SupportPolicy {
        self.support.get(&kind).cloned().unwrap_or_default()
    }
}

/// The preview pipeline: host collaborators, hooks and configuration.
#[derive(Debug, Clone)]
pub struct Vrt {
    pub host: Host,
    pub hooks: Hooks,
    pub config: VrtConfig,
}

impl Vrt {
    pub fn new(host: Host, hooks: Hooks, config: VrtConfig) -> Self {
        Self { host, hooks, config }
    }

    pub fn registries(&self) -> Registries<'_> {
        Registries::new(self)
    }

    /// Current disabled set. A store that cannot be read counts as empty.
    pub fn disabled_set(&self) -> DisabledSet {
        match DisabledSet::load(self.host.options.as_ref(), &self.config.disabled_option_key) {
            Ok(set) => set,
            Err(e) => {
                warn!("failed to read disabled items: {e}");
                DisabledSet::default()
            }
        }
    }

    /// Absolute URL on the site for `path` (which starts with `/`).
    pub fn home_url(&self, path: &str) -> String {
        format!("{}{}", self.config.home_url.trim_end_matches('/'), path)
    }

    /// Absolute URL of the virtual prefix.
    pub fn base_url(&self) -> String {
        self.home_url(&format!("/{}", self.config.prefix))
    }

    /// Site-relative URL of one unit.
    pub fn unit_path(&self, kind: UnitKind, slug: &str) -> String {
        format!("/{}/{kind}/{slug}", self.config.prefix)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::host::{Host, MemoryOptions, MemorySite, SiteFixture};
    use crate::{Hooks, Vrt, VrtConfig};

    pub(crate) fn vrt_with(fixture: SiteFixture) -> Vrt {
        vrt_with_hooks(fixture, Hooks::new())
    }

    pub(crate) fn vrt_with_hooks(fixture: SiteFixture, hooks: Hooks) -> Vrt {
        let site = Arc::new(MemorySite::from_fixture(fixture));
        let host = Host::from_site(site, Arc::new(MemoryOptions::new()));
        Vrt::new(host, hooks, VrtConfig::default())
    }
}
