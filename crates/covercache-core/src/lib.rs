//! Covercache core library.
//!
//! Client-side data access for the insurance portal backend: a typed REST
//! client, an in-memory TTL cache with canonical parameter keys and shared
//! in-flight requests, a durable local store used when the backend is
//! unavailable, and per-resource services that tie them together.
//!
//! ```no_run
//! use std::sync::Arc;
//! use covercache_core::{ApiClient, Config, FileStore, Services};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let api = ApiClient::new(&config.api_base_url)?;
//! let store = Arc::new(FileStore::new(config.data_dir()?)?);
//! let services = Services::new(api, &config.cache, store);
//!
//! let policies = services.policies.get_user_policies(false).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use cache::{CacheKey, CacheStats, KeyedTtlCache, SingleSlot};
pub use config::{CacheSettings, Config};
pub use services::{
    AssetError, AssetsService, CatalogService, DashboardService, PoliciesService, Services,
};
pub use store::{BlobStore, FallbackCollection, FileStore, MemoryStore, StoreError};
