use serde::{Deserialize, Serialize};

use super::amount;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyCounts {
    pub total: u32,
    pub active: u32,
    pub expiring_soon: u32,
    pub expired: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentSummary {
    #[serde(deserialize_with = "amount::flexible")]
    pub pending_amount: f64,
    pub pending_count: u32,
    #[serde(deserialize_with = "amount::flexible")]
    pub overdue_amount: f64,
    pub overdue_count: u32,
    pub next_payment_date: Option<String>,
    #[serde(deserialize_with = "amount::flexible_opt")]
    pub next_payment_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimCounts {
    pub total: u32,
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub policies: PolicyCounts,
    pub payments: PaymentSummary,
    pub claims: ClaimCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub timestamp: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_color: Option<String>,
    #[serde(default)]
    pub bg_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub priority: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingPayment {
    pub id: String,
    pub policy: PaymentPolicyRef,
    #[serde(deserialize_with = "amount::flexible")]
    pub amount: f64,
    pub due_date: String,
    #[serde(default)]
    pub is_overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPolicyRef {
    pub id: String,
    pub policy_number: String,
    pub policy_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringPolicy {
    pub id: String,
    pub policy_number: String,
    pub policy_type: String,
    pub end_date: String,
    pub days_remaining: i64,
}

/// Everything the dashboard page renders, fetched in one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub recent_activity: Vec<ActivityEvent>,
    pub recommendations: Vec<Recommendation>,
    pub upcoming_payments: Vec<UpcomingPayment>,
    pub expiring_policies: Vec<ExpiringPolicy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_parses_camel_case_payload() {
        let json = r#"{
            "stats": {
                "policies": {"total": 3, "active": 2, "expiringSoon": 1, "expired": 0},
                "payments": {"pendingAmount": "4500.00", "pendingCount": 1,
                             "overdueAmount": 0, "overdueCount": 0,
                             "nextPaymentDate": "2024-06-01", "nextPaymentAmount": 4500},
                "claims": {"total": 1, "pending": 1, "approved": 0, "rejected": 0}
            },
            "recentActivity": [
                {"id": "a1", "type": "payment", "title": "Payment received",
                 "description": "KES 4,500", "timestamp": "2024-05-01T10:00:00Z"}
            ],
            "recommendations": [],
            "upcomingPayments": [],
            "expiringPolicies": [
                {"id": "p1", "policy_number": "POL-1", "policy_type": "Motor",
                 "end_date": "2024-06-10", "days_remaining": 12}
            ]
        }"#;
        let data: DashboardData = serde_json::from_str(json).unwrap();
        assert_eq!(data.stats.policies.expiring_soon, 1);
        assert_eq!(data.stats.payments.pending_amount, 4500.0);
        assert_eq!(data.stats.payments.next_payment_amount, Some(4500.0));
        assert_eq!(data.recent_activity[0].kind, "payment");
        assert_eq!(data.expiring_policies[0].days_remaining, 12);
    }

    #[test]
    fn test_missing_sections_default() {
        let data: DashboardData = serde_json::from_str("{}").unwrap();
        assert_eq!(data, DashboardData::default());
    }
}
