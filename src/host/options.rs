//! Option stores: process memory and a JSON file on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use super::OptionStore;
use crate::{Error, Result};

/// Options kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryOptions {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Store("option store lock poisoned".into())
}

impl OptionStore for MemoryOptions {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().map_err(poisoned)?.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// Options persisted as one JSON object in a file, rewritten on every change
/// so they survive restarts.
#[derive(Debug)]
pub struct JsonFileOptions {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl OptionStore for JsonFileOptions {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value);
        self.write_all(&values)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}
