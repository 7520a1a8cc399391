use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;

use super::DurableStore;

/// In-memory store. Stands in for browser storage in tests and counts writes
/// per key so tests can assert how often state was committed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<String, String>,
    writes: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls made for `key`.
    pub fn write_count(&self, key: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.writes.get(key).copied().unwrap_or(0)
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.values.insert(key.to_string(), value.to_string());
        *inner.writes.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.values.remove(key);
        Ok(())
    }
}
