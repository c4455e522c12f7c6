//! Shared fixtures for the integration tests: a mock backend and JSON
//! payloads shaped like the real API's.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use covercache_core::{ApiClient, BlobStore, CacheSettings, MemoryStore, Services};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const API_PREFIX: &str = "/api/v1";

pub fn api_path(path: &str) -> String {
    format!("{}/{}", API_PREFIX, path.trim_start_matches('/'))
}

pub fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(format!("{}{}", server.uri(), API_PREFIX)).unwrap()
}

pub fn settings() -> CacheSettings {
    CacheSettings::default()
}

pub fn services(server: &MockServer) -> Services {
    services_with(server, &settings(), Arc::new(MemoryStore::new()))
}

pub fn services_with(
    server: &MockServer,
    settings: &CacheSettings,
    store: Arc<dyn BlobStore>,
) -> Services {
    Services::new(client(server), settings, store)
}

/// Requests the mock server has seen for `path` (any method).
pub async fn hits(server: &MockServer, path: &str) -> usize {
    let full = api_path(path);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.path() == full)
        .count()
}

pub async fn sleep_past(ttl: Duration) {
    tokio::time::sleep(ttl + Duration::from_millis(30)).await;
}

pub fn policy_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "policy_number": format!("POL-{}", id),
        "policy_type": {"id": "t-1", "name": "Comprehensive Motor"},
        "insurance_company": {"id": "c-1", "name": "Jubilee"},
        "status": status,
        "coverage_amount": "1500000.00",
        "premium_amount": 45000,
        "start_date": "2024-01-01",
        "end_date": "2025-01-01"
    })
}

pub fn policy_type_json(id: &str, category: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Policy {}", id),
        "slug": format!("policy-{}", id),
        "category": {"id": "cat-1", "name": category, "slug": category},
        "insurance_company": {"id": "c-1", "name": "Jubilee"},
        "base_premium": "12000.00"
    })
}

pub fn asset_json(id: &str, asset_type: &str, name: &str) -> Value {
    json!({
        "id": id,
        "user": "u-1",
        "asset_type": asset_type,
        "name": name,
        "details": {},
        "created_at": "2024-05-01T08:30:00Z",
        "updated_at": "2024-05-01T08:30:00Z"
    })
}

pub fn dashboard_json(total_policies: u32) -> Value {
    json!({
        "stats": {
            "policies": {"total": total_policies, "active": total_policies, "expiringSoon": 0, "expired": 0}
        },
        "recentActivity": [],
        "recommendations": [],
        "upcomingPayments": [],
        "expiringPolicies": []
    })
}
