//! Durable local storage for fallback data.
//!
//! A [`BlobStore`] holds whole serialized blobs under fixed keys and survives
//! process restarts (for [`FileStore`]). [`FallbackCollection`] layers a typed
//! collection on top: the last-known-good copy of a resource that is read only
//! when the backend cannot be reached.

pub mod collection;
pub mod error;
pub mod file;
pub mod memory;

pub use collection::{CachedData, FallbackCollection};
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Whole-blob key/value storage. No partial-record access.
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`, `None` if nothing is stored.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the blob stored under `key`.
    fn write(&self, key: &str, contents: &str) -> Result<(), StoreError>;

    /// Delete the blob stored under `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
