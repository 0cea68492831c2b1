//! Extension points.
//!
//! Every point where a theme or plugin may alter behaviour (enablement,
//! sample content, family lists, collected styles, final HTML, ...) is an
//! ordered [`FilterChain`]. Callbacks receive the current value plus a
//! read-only context and return the next value; they run in registration
//! order.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::host::NewItem;
use crate::registry::{Family, RenderableUnit, ScenarioDef, UnitKind};
use crate::sample::SampleBlock;
use crate::styles::CollectedStyles;

type Filter<T, C> = Arc<dyn Fn(T, &C) -> T + Send + Sync>;

/// An ordered list of `(value, context) -> value` callbacks.
pub struct FilterChain<T, C: ?Sized = ()> {
    filters: Vec<Filter<T, C>>,
}

impl<T, C: ?Sized> FilterChain<T, C> {
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Append a callback; it runs after every previously added one.
    pub fn add<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(T, &C) -> T + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(f));
        self
    }

    pub fn apply(&self, value: T, ctx: &C) -> T {
        self.filters.iter().fold(value, |acc, f| f(acc, ctx))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<T, C: ?Sized> Default for FilterChain<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: ?Sized> Clone for FilterChain<T, C> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
        }
    }
}

impl<T, C: ?Sized> fmt::Debug for FilterChain<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("len", &self.filters.len())
            .finish()
    }
}

/// Context passed to enablement filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub kind: UnitKind,
    pub identifier: String,
}

/// Context passed to per-block sample filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    pub name: String,
    pub variation: Option<String>,
}

impl BlockRef {
    pub fn new(name: &str, variation: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            variation: variation.map(str::to_string),
        }
    }
}

/// Context passed to the final HTML filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub kind: UnitKind,
    pub slug: String,
    pub variation: Option<String>,
}

/// Variation entry as exposed to the `block_variations` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationDef {
    pub name: String,
    pub label: String,
}

/// All extension points, grouped in one registry.
#[derive(Debug, Clone, Default)]
pub struct Hooks {
    pub is_item_enabled: FilterChain<bool, ItemRef>,
    pub block_allowlist: FilterChain<Vec<String>>,
    pub block_denylist: FilterChain<Vec<String>>,
    pub block_variations: FilterChain<Vec<VariationDef>, str>,
    pub block_families: FilterChain<Vec<Family>>,
    pub block_content: FilterChain<Option<Vec<SampleBlock>>, BlockRef>,
    pub block_attributes: FilterChain<Map<String, Value>, BlockRef>,
    pub is_dynamic_block: FilterChain<bool, str>,
    pub dynamic_item_id: FilterChain<Option<u64>>,
    pub fallback_item: FilterChain<Option<NewItem>>,
    pub register_scenarios: FilterChain<Vec<ScenarioDef>>,
    pub discoverable: FilterChain<Vec<RenderableUnit>, UnitKind>,
    pub collected_styles: FilterChain<CollectedStyles>,
    pub html_output: FilterChain<String, PageRef>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_run_in_registration_order() {
        let mut chain: FilterChain<String> = FilterChain::new();
        chain.add(|v, _| format!("{v}a"));
        chain.add(|v, _| format!("{v}b"));
        assert_eq!(chain.apply(String::from(">"), &()), ">ab");
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain: FilterChain<bool, str> = FilterChain::new();
        assert!(chain.apply(true, "core/paragraph"));
        assert!(chain.is_empty());
    }
}
