use std::time::Duration;

use crate::api::{ApiClient, ApiError};
use crate::cache::SingleSlot;
use crate::models::{
    ActivityEvent, DashboardData, DashboardStats, ExpiringPolicy, Recommendation,
    UpcomingPayment,
};

pub(crate) const DASHBOARD_RESOURCE: &str = "dashboard";

pub const DEFAULT_ACTIVITY_LIMIT: u32 = 10;
pub const DEFAULT_PAYMENTS_LIMIT: u32 = 5;
pub const DEFAULT_EXPIRING_DAYS: u32 = 30;

/// The customer overview page. Only the aggregate payload is cached.
#[derive(Clone)]
pub struct DashboardService {
    api: ApiClient,
    slot: SingleSlot<DashboardData>,
}

impl DashboardService {
    pub fn new(api: ApiClient, ttl: Duration) -> Self {
        Self {
            api,
            slot: SingleSlot::new(DASHBOARD_RESOURCE, ttl),
        }
    }

    /// Handle to the cached dashboard, for services whose mutations change it.
    pub(crate) fn slot(&self) -> SingleSlot<DashboardData> {
        self.slot.clone()
    }

    pub async fn get_dashboard_data(&self, force: bool) -> Result<DashboardData, ApiError> {
        let api = self.api.clone();
        self.slot
            .get(force, move || async move { api.fetch_dashboard().await })
            .await
    }

    pub fn clear_dashboard_cache(&self) {
        self.slot.clear();
    }

    pub fn cache_age(&self) -> Option<String> {
        self.slot.age_display()
    }

    pub async fn get_dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.api.fetch_dashboard_stats().await
    }

    pub async fn get_recent_activity(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<ActivityEvent>, ApiError> {
        self.api
            .fetch_recent_activity(limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT))
            .await
    }

    pub async fn get_recommendations(&self) -> Result<Vec<Recommendation>, ApiError> {
        self.api.fetch_recommendations().await
    }

    pub async fn get_upcoming_payments(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<UpcomingPayment>, ApiError> {
        self.api
            .fetch_upcoming_payments(limit.unwrap_or(DEFAULT_PAYMENTS_LIMIT))
            .await
    }

    pub async fn get_expiring_policies(
        &self,
        days: Option<u32>,
    ) -> Result<Vec<ExpiringPolicy>, ApiError> {
        self.api
            .fetch_expiring_policies(days.unwrap_or(DEFAULT_EXPIRING_DAYS))
            .await
    }
}
