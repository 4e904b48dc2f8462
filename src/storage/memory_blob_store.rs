use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use anyhow::Result;

use crate::types::RecordId;

use super::KeyValueBlobStore;

pub struct InMemoryBlobStore {
    data: Arc<RwLock<HashMap<(RecordId, String), Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl KeyValueBlobStore for InMemoryBlobStore {
    fn get(&self, record_id: RecordId, key: &str) -> Result<Option<Vec<u8>>> {
        log::debug!("BLOB GET: record={}, key='{}'", record_id, key);
        let data = self
            .data
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock"))?;
        let blob = data.get(&(record_id, key.to_string())).cloned();
        log::debug!(
            "BLOB GET RESULT: {} bytes",
            blob.as_ref().map(|b| b.len()).unwrap_or(0)
        );
        Ok(blob)
    }

    fn set(&self, record_id: RecordId, key: &str, blob: &[u8]) -> Result<()> {
        log::debug!(
            "BLOB SET: record={}, key='{}', size={} bytes",
            record_id,
            key,
            blob.len()
        );
        let mut data = self
            .data
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        data.insert((record_id, key.to_string()), blob.to_vec());
        Ok(())
    }

    fn delete(&self, record_id: RecordId, key: &str) -> Result<bool> {
        log::debug!("BLOB DELETE: record={}, key='{}'", record_id, key);
        let mut data = self
            .data
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        Ok(data.remove(&(record_id, key.to_string())).is_some())
    }

    /// Holds the write lock across the whole cycle.
    fn update(
        &self,
        record_id: RecordId,
        key: &str,
        f: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        let entry_key = (record_id, key.to_string());
        if let Some(blob) = f(data.get(&entry_key).cloned())? {
            log::debug!(
                "BLOB UPDATE: record={}, key='{}', size={} bytes",
                record_id,
                key,
                blob.len()
            );
            data.insert(entry_key, blob);
        }
        Ok(())
    }
}

impl Clone for InMemoryBlobStore {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}
