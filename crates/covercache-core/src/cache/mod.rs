//! In-memory response caching.
//!
//! - [`KeyedTtlCache`]: generic TTL cache keyed by resource plus canonical
//!   parameters, with read-through fetching that shares one pending request
//!   between concurrent callers.
//! - [`SingleSlot`]: one fixed resource with a fixed TTL, layered on
//!   `KeyedTtlCache`.
//!
//! Expiry is checked on read. There is no background sweeper; call
//! [`KeyedTtlCache::cleanup`] to purge expired entries eagerly.

pub mod entry;
pub mod key;
pub mod keyed;
pub mod slot;

pub use entry::CacheEntry;
pub use key::CacheKey;
pub use keyed::{CacheStats, KeyedTtlCache, DEFAULT_TTL};
pub use slot::SingleSlot;
