//! API client for the insurance portal REST backend.
//!
//! This module provides the `ApiClient` struct: request plumbing (auth header,
//! 429 backoff, status classification) plus one method per backend endpoint.
//! Nothing here caches; the services layer does that.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::ApiError;
use crate::models::{
    ActivityEvent, Asset, AssetPatch, CreateAssetInput, DashboardData, DashboardStats,
    ExpiringPolicy, InsuranceCompany, ListResponse, NewPolicyReview, Policy, PolicyCategory,
    PolicyDetail, PolicyReview, PolicyStats, PolicyType, PolicyTypeDetail, PolicyTypeFilters,
    Recommendation, UpcomingPayment,
};

// ============================================================================
// Constants
// ============================================================================

/// Backend used when nothing is configured (local development server).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the portal backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8000/api/v1`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request, retrying on 429 with exponential backoff.
    /// `build` is called once per attempt.
    async fn send(
        &self,
        method: Method,
        path: &str,
        build: impl Fn(RequestBuilder) -> RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build(self.request(method.clone(), path)).send().await?;
            let status = response.status();

            if status.is_success() {
                debug!(%method, path, status = status.as_u16(), "Request succeeded");
                return Ok(response);
            }

            if status.as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(path, retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            debug!(%method, path, status = status.as_u16(), "Request failed");
            return Err(ApiError::from_status(status, &body));
        }
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        Self::json(self.send(Method::GET, path, |req| req).await?).await
    }

    async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        Self::json(self.send(Method::GET, path, |req| req.query(query)).await?).await
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let list: ListResponse<T> = self.get(path).await?;
        Ok(list.into_vec())
    }

    async fn get_list_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let list: ListResponse<T> = self.get_with_query(path, query).await?;
        Ok(list.into_vec())
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        Self::json(self.send(Method::POST, path, |req| req.json(body)).await?).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        Self::json(self.send(Method::PATCH, path, |req| req.json(body)).await?).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, |req| req).await?;
        Ok(())
    }

    // ===== Dashboard =====

    pub async fn fetch_dashboard(&self) -> Result<DashboardData, ApiError> {
        self.get("dashboard/").await
    }

    pub async fn fetch_dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get("dashboard/stats/").await
    }

    pub async fn fetch_recent_activity(&self, limit: u32) -> Result<Vec<ActivityEvent>, ApiError> {
        self.get_list_with_query("dashboard/activity/", &[("limit", limit)])
            .await
    }

    pub async fn fetch_recommendations(&self) -> Result<Vec<Recommendation>, ApiError> {
        self.get_list("dashboard/recommendations/").await
    }

    pub async fn fetch_upcoming_payments(
        &self,
        limit: u32,
    ) -> Result<Vec<UpcomingPayment>, ApiError> {
        self.get_list_with_query("dashboard/upcoming-payments/", &[("limit", limit)])
            .await
    }

    pub async fn fetch_expiring_policies(&self, days: u32) -> Result<Vec<ExpiringPolicy>, ApiError> {
        self.get_list_with_query("dashboard/expiring-policies/", &[("days", days)])
            .await
    }

    // ===== My policies =====

    pub async fn fetch_user_policies(&self) -> Result<Vec<Policy>, ApiError> {
        self.get_list("policies/my-policies/").await
    }

    pub async fn fetch_policy(&self, id: &str) -> Result<PolicyDetail, ApiError> {
        self.get(&format!("policies/my-policies/{}/", id)).await
    }

    pub async fn fetch_policy_stats(&self) -> Result<PolicyStats, ApiError> {
        self.get("policies/my-policies/stats/").await
    }

    pub async fn cancel_policy(&self, id: &str, reason: Option<&str>) -> Result<Value, ApiError> {
        self.post(
            &format!("policies/my-policies/{}/cancel/", id),
            &serde_json::json!({ "reason": reason }),
        )
        .await
    }

    pub async fn renew_policy(&self, id: &str) -> Result<Value, ApiError> {
        self.post(
            &format!("policies/my-policies/{}/renew/", id),
            &serde_json::json!({}),
        )
        .await
    }

    // ===== Catalog =====

    pub async fn fetch_categories(&self) -> Result<Vec<PolicyCategory>, ApiError> {
        self.get_list("policies/categories/").await
    }

    pub async fn fetch_category(&self, slug: &str) -> Result<PolicyCategory, ApiError> {
        self.get(&format!("policies/categories/{}/", slug)).await
    }

    pub async fn fetch_companies(&self) -> Result<Vec<InsuranceCompany>, ApiError> {
        self.get_list("policies/companies/").await
    }

    pub async fn fetch_company(&self, id: &str) -> Result<InsuranceCompany, ApiError> {
        self.get(&format!("policies/companies/{}/", id)).await
    }

    pub async fn fetch_policy_types(
        &self,
        filters: &PolicyTypeFilters,
    ) -> Result<Vec<PolicyType>, ApiError> {
        self.get_list_with_query("policies/types/", filters).await
    }

    pub async fn fetch_featured_policy_types(&self) -> Result<Vec<PolicyType>, ApiError> {
        self.get_list("policies/types/featured/").await
    }

    pub async fn fetch_policy_type(&self, id: &str) -> Result<PolicyTypeDetail, ApiError> {
        self.get(&format!("policies/types/{}/", id)).await
    }

    pub async fn fetch_policy_reviews(
        &self,
        policy_type_id: &str,
    ) -> Result<Vec<PolicyReview>, ApiError> {
        self.get_list_with_query("policies/reviews/", &[("policy_type", policy_type_id)])
            .await
    }

    pub async fn submit_policy_review(
        &self,
        review: &NewPolicyReview,
    ) -> Result<PolicyReview, ApiError> {
        self.post("policies/reviews/", review).await
    }

    // ===== Assets =====

    pub async fn fetch_assets(&self) -> Result<Vec<Asset>, ApiError> {
        self.get_list("assets/").await
    }

    pub async fn create_asset(&self, input: &CreateAssetInput) -> Result<Asset, ApiError> {
        self.post("assets/", input).await
    }

    pub async fn update_asset(&self, id: &str, patch: &AssetPatch) -> Result<Asset, ApiError> {
        self.patch(&format!("assets/{}/", id), patch).await
    }

    pub async fn delete_asset(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("assets/{}/", id)).await
    }
}
