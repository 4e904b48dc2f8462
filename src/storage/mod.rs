mod blob_store;
mod encrypted_blob_store;
mod memory_blob_store;
mod sqlite_blob_store;

pub use blob_store::{ArcBlobStore, KeyValueBlobStore};
pub use encrypted_blob_store::EncryptedBlobStore;
pub use memory_blob_store::InMemoryBlobStore;
pub use sqlite_blob_store::SqliteBlobStore;
