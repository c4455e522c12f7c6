//! Concurrent readers of one cache key share a single backend request.

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{api_path, dashboard_json, hits, policy_json, services};

#[tokio::test]
async fn test_concurrent_cold_reads_issue_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("policies/my-policies/")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([policy_json("p-1", "active")]))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let services = services(&server);
    let (a, b, c) = tokio::join!(
        services.policies.get_user_policies(false),
        services.policies.get_user_policies(false),
        services.policies.get_user_policies(false),
    );

    let a = a.unwrap();
    assert_eq!(a, b.unwrap());
    assert_eq!(a, c.unwrap());
}

#[tokio::test]
async fn test_concurrent_reads_across_tasks_share_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("dashboard/")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(dashboard_json(4))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let services = services(&server);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dashboard = services.dashboard.clone();
            tokio::spawn(async move { dashboard.get_dashboard_data(false).await })
        })
        .collect();

    for handle in handles {
        let data = handle.await.unwrap().unwrap();
        assert_eq!(data.stats.policies.total, 4);
    }
}

#[tokio::test]
async fn test_shared_failure_reaches_every_waiter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("policies/my-policies/")))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let services = services(&server);
    let (a, b) = tokio::join!(
        services.policies.get_user_policies(false),
        services.policies.get_user_policies(false),
    );
    assert!(a.is_err());
    assert!(b.is_err());
}

#[tokio::test]
async fn test_mutation_during_fetch_is_not_overwritten() {
    let server = MockServer::start().await;
    // The slow read observes pre-cancel state
    Mock::given(method("GET"))
        .and(path(api_path("policies/my-policies/")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([policy_json("p-1", "active")]))
                .set_delay(Duration::from_millis(200)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("policies/my-policies/")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([policy_json("p-1", "cancelled")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("policies/my-policies/p-1/cancel/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let services = services(&server);
    let slow_read = services.policies.get_user_policies(false);
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        services.policies.cancel_policy("p-1", None).await
    };
    let (stale, cancelled) = tokio::join!(slow_read, cancel);
    cancelled.unwrap();
    assert!(stale.unwrap()[0].is_active());

    // The slow response must not have repopulated the cache
    let fresh = services.policies.get_user_policies(false).await.unwrap();
    assert!(!fresh[0].is_active());
    assert_eq!(hits(&server, "policies/my-policies/").await, 2);
}
