use std::sync::Arc;

use age::secrecy::SecretString;
use anyhow::Result;

use crate::types::RecordId;

use super::{ArcBlobStore, KeyValueBlobStore};

/// EncryptedBlobStore transparently encrypts the blobs of another store using
/// age with passphrase-derived keys. Record ids and keys stay in the clear.
pub struct EncryptedBlobStore {
    inner: ArcBlobStore,
    recipient: age::scrypt::Recipient,
    identity: age::scrypt::Identity,
}

impl EncryptedBlobStore {
    pub fn new(inner: Box<dyn KeyValueBlobStore>, passphrase: String) -> Self {
        let secret = SecretString::from(passphrase);
        let recipient = age::scrypt::Recipient::new(secret.clone());
        let identity = age::scrypt::Identity::new(secret);
        Self {
            inner: ArcBlobStore::new(Arc::from(inner)),
            recipient,
            identity,
        }
    }

    fn encrypt_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let encrypted = age::encrypt(&self.recipient, data)?;
        Ok(encrypted)
    }

    fn decrypt_bytes(&self, encrypted: &[u8]) -> Result<Vec<u8>> {
        let decrypted = age::decrypt(&self.identity, encrypted)?;
        Ok(decrypted)
    }
}

impl KeyValueBlobStore for EncryptedBlobStore {
    fn get(&self, record_id: RecordId, key: &str) -> Result<Option<Vec<u8>>> {
        log::debug!("ENCRYPTED BLOB GET: record={}, key='{}'", record_id, key);
        self.inner
            .get(record_id, key)?
            .map(|encrypted| self.decrypt_bytes(&encrypted))
            .transpose()
    }

    fn set(&self, record_id: RecordId, key: &str, blob: &[u8]) -> Result<()> {
        log::debug!(
            "ENCRYPTED BLOB SET: record={}, key='{}', size={} bytes",
            record_id,
            key,
            blob.len()
        );
        let encrypted = self.encrypt_bytes(blob)?;
        self.inner.set(record_id, key, &encrypted)
    }

    fn delete(&self, record_id: RecordId, key: &str) -> Result<bool> {
        self.inner.delete(record_id, key)
    }

    /// Decrypts and re-encrypts inside the inner store's cycle, so atomicity
    /// is whatever the inner store provides.
    fn update(
        &self,
        record_id: RecordId,
        key: &str,
        f: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        self.inner.update(record_id, key, &mut |current| {
            let plain = current
                .map(|encrypted| self.decrypt_bytes(&encrypted))
                .transpose()?;
            f(plain)?.map(|blob| self.encrypt_bytes(&blob)).transpose()
        })
    }
}
