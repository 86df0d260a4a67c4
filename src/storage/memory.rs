use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::KvStore;
use crate::error::CatalogError;

/// Non-durable store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write
    pub fn read_only() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            read_only: true,
        }
    }

    fn check_writable(&self) -> Result<(), CatalogError> {
        if self.read_only {
            return Err(CatalogError::Persistence("storage is read-only".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CatalogError> {
        self.entries
            .lock()
            .map_err(|e| CatalogError::Persistence(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CatalogError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CatalogError> {
        self.check_writable()?;
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CatalogError> {
        self.check_writable()?;
        self.lock()?.remove(key);
        Ok(())
    }
}
