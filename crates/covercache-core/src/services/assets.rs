//! The user's registered assets, with a local fallback.
//!
//! Reads try the backend and fall back to the durable [`FallbackCollection`]
//! when it fails; the result (either one, never a mix) is cached in memory.
//! Mutations try the backend first and, on failure, apply the same change to
//! the durable copy and return a locally built record. The two copies are
//! never reconciled automatically.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::cache::SingleSlot;
use crate::models::{Asset, AssetPatch, CreateAssetInput};
use crate::store::{BlobStore, FallbackCollection, StoreError};

/// Store key for the local copy of the asset list.
pub const ASSETS_STORE_KEY: &str = "user_assets";

const ASSETS_RESOURCE: &str = "assets";

/// Doublings beyond this cannot matter for any sane cap.
const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Local asset store failed: {0}")]
    Store(#[from] StoreError),
}

/// How long to keep serving a fallback list after `failures` consecutive
/// backend failures: `ttl`, then doubling, never above `max` (or `ttl` if
/// that is larger).
pub(crate) fn fallback_ttl(ttl: Duration, failures: u32, max: Duration) -> Duration {
    if failures <= 1 {
        return ttl;
    }
    let factor = 1u32 << (failures - 1).min(MAX_BACKOFF_EXPONENT);
    ttl.saturating_mul(factor).min(max.max(ttl))
}

fn local_asset_id(millis: i64) -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("local-{}-{:04x}", millis, suffix)
}

#[derive(Clone)]
pub struct AssetsService {
    api: ApiClient,
    slot: SingleSlot<Vec<Asset>, Infallible>,
    fallback: Arc<FallbackCollection<Asset>>,
    failures: Arc<AtomicU32>,
    max_backoff: Duration,
}

impl AssetsService {
    pub fn new(
        api: ApiClient,
        store: Arc<dyn BlobStore>,
        ttl: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            api,
            slot: SingleSlot::new(ASSETS_RESOURCE, ttl),
            fallback: Arc::new(FallbackCollection::new(store, ASSETS_STORE_KEY)),
            failures: Arc::new(AtomicU32::new(0)),
            max_backoff,
        }
    }

    /// The asset list from the backend, or the local copy if the backend
    /// fails. Never errors: an unreadable local copy is an empty list.
    pub async fn get_user_assets(&self, force: bool) -> Vec<Asset> {
        let api = self.api.clone();
        let fallback = Arc::clone(&self.fallback);
        let failures = Arc::clone(&self.failures);
        let ttl = self.slot.ttl();
        let max_backoff = self.max_backoff;

        let result = self
            .slot
            .get_with_ttl(force, move || async move {
                match api.fetch_assets().await {
                    Ok(assets) => {
                        failures.store(0, Ordering::SeqCst);
                        Ok((assets, ttl))
                    }
                    Err(e) => {
                        let failed = failures.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                        let hold = fallback_ttl(ttl, failed, max_backoff);
                        warn!(
                            error = %e,
                            consecutive_failures = failed,
                            hold_secs = hold.as_secs(),
                            "Assets backend unavailable, using local copy"
                        );
                        let assets = fallback.load();
                        info!(count = assets.len(), "Serving assets from local store");
                        Ok((assets, hold))
                    }
                }
            })
            .await;

        match result {
            Ok(assets) => assets,
            Err(never) => match never {},
        }
    }

    pub async fn get_user_vehicles(&self) -> Vec<Asset> {
        self.get_user_assets(false)
            .await
            .into_iter()
            .filter(Asset::is_vehicle)
            .collect()
    }

    pub async fn create_asset(&self, input: CreateAssetInput) -> Result<Asset, AssetError> {
        let err = match self.api.create_asset(&input).await {
            Ok(asset) => {
                self.slot.clear();
                return Ok(asset);
            }
            Err(e) => e,
        };
        warn!(error = %err, "Asset create failed on backend, saving locally");

        let now = Utc::now();
        let asset = Asset::from_input(local_asset_id(now.timestamp_millis()), input, now);
        let stored = asset.clone();
        let saved = self.fallback.modify(|items| {
            items.push(stored);
            Ok(())
        });
        self.slot.clear();
        saved?;
        Ok(asset)
    }

    /// Update an asset. The local fallback fails with
    /// [`StoreError::NotFound`] if `id` is not in the local copy.
    pub async fn update_asset(&self, id: &str, patch: AssetPatch) -> Result<Asset, AssetError> {
        let err = match self.api.update_asset(id, &patch).await {
            Ok(asset) => {
                self.slot.clear();
                return Ok(asset);
            }
            Err(e) => e,
        };
        warn!(asset_id = id, error = %err, "Asset update failed on backend, updating locally");

        let now = Utc::now();
        let updated = self.fallback.modify(|items| {
            let asset = items
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            asset.apply(&patch, now);
            Ok(asset.clone())
        });
        self.slot.clear();
        Ok(updated?)
    }

    /// Delete an asset. Deleting an id missing from the local copy is a no-op.
    pub async fn delete_asset(&self, id: &str) -> Result<(), AssetError> {
        let err = match self.api.delete_asset(id).await {
            Ok(()) => {
                self.slot.clear();
                return Ok(());
            }
            Err(e) => e,
        };
        warn!(asset_id = id, error = %err, "Asset delete failed on backend, deleting locally");

        let removed = self.fallback.modify(|items| {
            let before = items.len();
            items.retain(|a| a.id != id);
            Ok(before - items.len())
        });
        self.slot.clear();
        if removed? == 0 {
            info!(asset_id = id, "Asset not in local store, nothing to delete");
        }
        Ok(())
    }

    pub fn clear_assets_cache(&self) {
        self.slot.clear();
    }

    /// Delete the durable local copy and the in-memory list built from it.
    pub fn clear_local_copy(&self) -> Result<(), StoreError> {
        self.fallback.clear()?;
        self.slot.clear();
        Ok(())
    }

    pub fn cache_age(&self) -> Option<String> {
        self.slot.age_display()
    }

    /// When the local copy was last written, if ever.
    pub fn local_copy_age(&self) -> Option<String> {
        self.fallback.age_display()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }
}
