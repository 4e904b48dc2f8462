use std::sync::Arc;

use anyhow::Result;

use crate::types::RecordId;

/// Per-record key-value blob storage supplied by the host.
pub trait KeyValueBlobStore: Send + Sync {
    fn get(&self, record_id: RecordId, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, record_id: RecordId, key: &str, blob: &[u8]) -> Result<()>;

    /// Removes the blob. Returns false if there was nothing to remove.
    fn delete(&self, record_id: RecordId, key: &str) -> Result<bool>;

    /// Read-modify-write of one blob. `f` receives the current blob and
    /// returns the replacement, or `None` to leave storage untouched.
    ///
    /// The default is a plain get followed by set: two concurrent callers on
    /// the same record race and the last writer wins. Stores with
    /// transactions override this to make the cycle atomic.
    fn update(
        &self,
        record_id: RecordId,
        key: &str,
        f: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        let current = self.get(record_id, key)?;
        if let Some(blob) = f(current)? {
            self.set(record_id, key, &blob)?;
        }
        Ok(())
    }
}

// KeyValueBlobStore wrapper to allow Arc<dyn KeyValueBlobStore> to implement KeyValueBlobStore
#[derive(Clone)]
pub struct ArcBlobStore {
    inner: Arc<dyn KeyValueBlobStore>,
}

impl ArcBlobStore {
    pub fn new(target: Arc<dyn KeyValueBlobStore>) -> Self {
        Self { inner: target }
    }
}

impl KeyValueBlobStore for ArcBlobStore {
    fn get(&self, record_id: RecordId, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(record_id, key)
    }

    fn set(&self, record_id: RecordId, key: &str, blob: &[u8]) -> Result<()> {
        self.inner.set(record_id, key, blob)
    }

    fn delete(&self, record_id: RecordId, key: &str) -> Result<bool> {
        self.inner.delete(record_id, key)
    }

    fn update(
        &self,
        record_id: RecordId,
        key: &str,
        f: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        self.inner.update(record_id, key, f)
    }
}
