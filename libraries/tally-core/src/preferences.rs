//! In-memory preference store

use crate::error::{Result, TallyError};
use crate::traits::PreferenceStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// Thread-safe `PreferenceStore` kept entirely in memory
///
/// Useful for hosts that persist preferences themselves and for tests.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, bool>>,
}

impl MemoryPreferenceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `values`
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        Self {
            values: RwLock::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Snapshot of every stored value
    pub fn snapshot(&self) -> Result<HashMap<String, bool>> {
        let values = self
            .values
            .read()
            .map_err(|e| TallyError::preferences(e.to_string()))?;
        Ok(values.clone())
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn contains(&self, key: &str) -> Result<bool> {
        let values = self
            .values
            .read()
            .map_err(|e| TallyError::preferences(e.to_string()))?;
        Ok(values.contains_key(key))
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        let values = self
            .values
            .read()
            .map_err(|e| TallyError::preferences(e.to_string()))?;
        Ok(values.get(key).copied().unwrap_or(default))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| TallyError::preferences(e.to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
