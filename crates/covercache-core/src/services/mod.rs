//! Cached data access, one service per backend resource.
//!
//! Each service owns its caches; nothing is global. Build them all at once
//! with [`Services::new`] and pass that around.

pub mod assets;
pub mod catalog;
pub mod dashboard;
pub mod policies;

use std::sync::Arc;

pub use assets::{AssetError, AssetsService, ASSETS_STORE_KEY};
pub use catalog::CatalogService;
pub use dashboard::DashboardService;
pub use policies::PoliciesService;

use crate::api::ApiClient;
use crate::config::CacheSettings;
use crate::store::BlobStore;

#[derive(Clone)]
pub struct Services {
    pub dashboard: DashboardService,
    pub policies: PoliciesService,
    pub catalog: CatalogService,
    pub assets: AssetsService,
}

impl Services {
    pub fn new(api: ApiClient, settings: &CacheSettings, store: Arc<dyn BlobStore>) -> Self {
        let dashboard = DashboardService::new(api.clone(), settings.dashboard_ttl());
        let policies =
            PoliciesService::new(api.clone(), settings.policies_ttl(), dashboard.slot());
        let catalog = CatalogService::new(api.clone(), settings.catalog_ttl());
        let assets = AssetsService::new(
            api,
            store,
            settings.assets_ttl(),
            settings.fallback_max_backoff(),
        );

        Self {
            dashboard,
            policies,
            catalog,
            assets,
        }
    }

    /// Drop every in-memory cache. The durable asset copy is untouched.
    pub fn clear_all(&self) {
        self.dashboard.clear_dashboard_cache();
        self.policies.clear_policies_cache();
        self.catalog.clear();
        self.assets.clear_assets_cache();
    }
}
