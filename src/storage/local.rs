//! redb-backed storage: one table of string keys to JSON bytes.

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;

use super::KvStore;
use crate::error::CatalogError;

const KV_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

pub struct RedbStore {
    db: Database,
}

fn persistence(err: impl std::fmt::Display) -> CatalogError {
    CatalogError::Persistence(err.to_string())
}

impl RedbStore {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let db = Database::create(path).map_err(persistence)?;
        // Ensure table exists
        let txn = db.begin_write().map_err(persistence)?;
        {
            let _ = txn.open_table(KV_TABLE).map_err(persistence)?;
        }
        txn.commit().map_err(persistence)?;
        Ok(Self { db })
    }
}

#[async_trait]
impl KvStore for RedbStore {
    fn backend_name(&self) -> &str {
        "redb"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CatalogError> {
        let rtxn = self.db.begin_read().map_err(persistence)?;
        let table = rtxn.open_table(KV_TABLE).map_err(persistence)?;
        let value = table.get(key).map_err(persistence)?;
        match value {
            Some(guard) => String::from_utf8(guard.value().to_vec())
                .map(Some)
                .map_err(persistence),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CatalogError> {
        let txn = self.db.begin_write().map_err(persistence)?;
        {
            let mut table = txn.open_table(KV_TABLE).map_err(persistence)?;
            table.insert(key, value.as_bytes()).map_err(persistence)?;
        }
        txn.commit().map_err(persistence)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CatalogError> {
        let txn = self.db.begin_write().map_err(persistence)?;
        {
            let mut table = txn.open_table(KV_TABLE).map_err(persistence)?;
            table.remove(key).map_err(persistence)?;
        }
        txn.commit().map_err(persistence)?;
        Ok(())
    }
}
