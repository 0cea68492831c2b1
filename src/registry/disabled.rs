//! Persisted disabled-items set.
//!
//! Stored as one option value, a JSON object mapping a unit kind to the
//! identifiers disabled for it:
//!
//! ```json
//! { "block": ["core/quote"], "pattern": ["theme/hero"] }
//! ```
//!
//! Toggles read the whole value, change it and write it back. Two toggles
//! racing on the same store are last-writer-wins; nothing here locks across
//! the read-modify-write.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde::{Deserialize, Serialize};

use super::UnitKind;
use crate::host::OptionStore;
use crate::Result;

/// Mapping from unit kind to disabled identifiers. A kind with nothing
/// disabled has no entry at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisabledSet {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl DisabledSet {
    /// Read the set stored under `key`. A missing value is an empty set; a
    /// malformed one is logged and treated as empty.
    pub fn load(store: &dyn OptionStore, key: &str) -> Result<Self> {
        let Some(value) = store.get(key)? else {
            return Ok(Self::default());
        };
        match serde_json::from_value::<DisabledSet>(value) {
            Ok(mut set) => {
                set.entries.retain(|_, ids| !ids.is_empty());
                Ok(set)
            }
            Err(e) => {
                warn!("ignoring malformed disabled-items option {key}: {e}");
                Ok(Self::default())
            }
        }
    }

    /// Write the set back; an empty set removes the option.
    pub fn save(&self, store: &dyn OptionStore, key: &str) -> Result<()> {
        if self.entries.is_empty() {
            return store.delete(key);
        }
        store.set(key, serde_json::to_value(self)?)
    }

    pub fn contains(&self, kind: UnitKind, identifier: &str) -> bool {
        self.entries
            .get(kind.as_str())
            .is_some_and(|ids| ids.contains(identifier))
    }

    /// Whether the kind has an entry.
    pub fn has_entry(&self, kind: UnitKind) -> bool {
        self.entries.contains_key(kind.as_str())
    }

    /// Disabled identifiers of one kind, sorted.
    pub fn ids(&self, kind: UnitKind) -> Vec<&str> {
        self.entries
            .get(kind.as_str())
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_disabled(&mut self, kind: UnitKind, identifier: &str, disabled: bool) {
        self.set_disabled_for_group(kind, [identifier], disabled);
    }

    /// Disable every listed identifier, or enable the whole kind (which
    /// drops its entry).
    pub fn set_disabled_for_all<I, S>(&mut self, kind: UnitKind, identifiers: I, disabled: bool)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !disabled {
            self.entries.remove(kind.as_str());
            return;
        }
        self.set_disabled_for_group(kind, identifiers, true);
    }

    pub fn set_disabled_for_group<I, S>(&mut self, kind: UnitKind, identifiers: I, disabled: bool)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.entries.entry(kind.as_str().to_string()).or_default();
        for id in identifiers {
            let id = id.as_ref();
            if id.is_empty() {
                continue;
            }
            if disabled {
                entry.insert(id.to_string());
            } else {
                entry.remove(id);
            }
        }
        if entry.is_empty() {
            self.entries.remove(kind.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryOptions;
    use serde_json::json;

    const KEY: &str = "wp_vrt_disabled_items";

    #[test]
    fn disabling_twice_equals_disabling_once() {
        let mut once = DisabledSet::default();
        once.set_disabled(UnitKind::Block, "core/quote", true);
        let mut twice = once.clone();
        twice.set_disabled(UnitKind::Block, "core/quote", true);
        assert_eq!(once, twice);
    }

    #[test]
    fn enable_all_after_disable_all_drops_entry() {
        let store = MemoryOptions::new();
        let mut set = DisabledSet::default();
        set.set_disabled_for_all(UnitKind::Pattern, ["a/one", "a/two"], true);
        set.set_disabled(UnitKind::Block, "core/quote", true);
        set.save(&store, KEY).unwrap();
        assert_eq!(
            store.get(KEY).unwrap(),
            Some(json!({"block": ["core/quote"], "pattern": ["a/one", "a/two"]}))
        );

        let mut set = DisabledSet::load(&store, KEY).unwrap();
        set.set_disabled_for_all(UnitKind::Pattern, Vec::<String>::new(), false);
        assert!(!set.has_entry(UnitKind::Pattern));
        set.save(&store, KEY).unwrap();
        assert_eq!(store.get(KEY).unwrap(), Some(json!({"block": ["core/quote"]})));
    }

    #[test]
    fn group_toggle_and_compaction() {
        let store = MemoryOptions::new();
        let mut set = DisabledSet::default();
        set.set_disabled_for_group(UnitKind::TemplatePart, ["header", "footer"], true);
        assert_eq!(set.ids(UnitKind::TemplatePart), ["footer", "header"]);
        set.set_disabled_for_group(UnitKind::TemplatePart, ["header", "footer"], false);
        assert!(set.is_empty());
        set.save(&store, KEY).unwrap();
        assert!(store.get(KEY).unwrap().is_none());
    }

    #[test]
    fn malformed_option_reads_as_empty() {
        let store = MemoryOptions::new();
        store.set(KEY, json!("not a map")).unwrap();
        assert!(DisabledSet::load(&store, KEY).unwrap().is_empty());
    }
}
