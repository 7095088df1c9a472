use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Durable key-value backend for small structured blobs
pub trait MappingStore: Send {
    /// Read the bytes stored under `key`, `None` if absent
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the bytes stored under `key`
    fn write(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// Process-local store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MappingStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
