use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::api::{ApiClient, ApiError};
use crate::cache::SingleSlot;
use crate::models::{DashboardData, Policy, PolicyDetail, PolicyStats};

const POLICIES_RESOURCE: &str = "policies/my-policies";

/// The signed-in user's own policies.
///
/// The list is cached in one slot. Cancel and renew clear it, and also clear
/// the dashboard slot since the dashboard aggregates policy counts.
#[derive(Clone)]
pub struct PoliciesService {
    api: ApiClient,
    slot: SingleSlot<Vec<Policy>>,
    dashboard: SingleSlot<DashboardData>,
}

impl PoliciesService {
    pub fn new(api: ApiClient, ttl: Duration, dashboard: SingleSlot<DashboardData>) -> Self {
        Self {
            api,
            slot: SingleSlot::new(POLICIES_RESOURCE, ttl),
            dashboard,
        }
    }

    pub async fn get_user_policies(&self, force: bool) -> Result<Vec<Policy>, ApiError> {
        let api = self.api.clone();
        self.slot
            .get(force, move || async move { api.fetch_user_policies().await })
            .await
    }

    pub async fn get_policy_by_id(&self, id: &str) -> Result<PolicyDetail, ApiError> {
        self.api.fetch_policy(id).await
    }

    pub async fn get_policy_stats(&self) -> Result<PolicyStats, ApiError> {
        self.api.fetch_policy_stats().await
    }

    pub async fn cancel_policy(&self, id: &str, reason: Option<&str>) -> Result<Value, ApiError> {
        let result = self.api.cancel_policy(id, reason).await?;
        info!(policy_id = id, "Policy cancelled");
        self.invalidate_after_write();
        Ok(result)
    }

    pub async fn renew_policy(&self, id: &str) -> Result<Value, ApiError> {
        let result = self.api.renew_policy(id).await?;
        info!(policy_id = id, "Policy renewed");
        self.invalidate_after_write();
        Ok(result)
    }

    pub fn clear_policies_cache(&self) {
        self.slot.clear();
    }

    pub fn cache_age(&self) -> Option<String> {
        self.slot.age_display()
    }

    fn invalidate_after_write(&self) {
        self.slot.clear();
        self.dashboard.clear();
    }
}
