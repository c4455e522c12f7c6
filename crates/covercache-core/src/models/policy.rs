use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::amount;
use super::catalog::RefSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    Active,
    Pending,
    Expired,
    Cancelled,
    #[serde(other)]
    Other,
}

/// One of the signed-in user's policies, as listed on "My Policies".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub policy_number: String,
    pub policy_type: RefSummary,
    pub insurance_company: RefSummary,
    pub status: PolicyStatus,
    #[serde(deserialize_with = "amount::flexible")]
    pub coverage_amount: f64,
    #[serde(deserialize_with = "amount::flexible")]
    pub premium_amount: f64,
    #[serde(default)]
    pub premium_frequency: Option<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Policy {
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }
}

/// Full policy record including history sections.
///
/// The nested sections are kept as raw JSON; nothing in the cache layer
/// looks inside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDetail {
    #[serde(flatten)]
    pub policy: Policy,
    #[serde(default)]
    pub vehicle_details: Option<Value>,
    #[serde(default)]
    pub coverage_details: Value,
    #[serde(default)]
    pub payment_history: Vec<Value>,
    #[serde(default)]
    pub claims_history: Vec<Value>,
    #[serde(default)]
    pub documents: Vec<Value>,
    #[serde(default)]
    pub beneficiaries: Vec<Value>,
    #[serde(default)]
    pub timeline: Vec<Value>,
}

/// Aggregates from `policies/my-policies/stats/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyStats {
    pub total_policies: u32,
    pub active_policies: u32,
    pub pending_policies: u32,
    pub expired_policies: u32,
    pub cancelled_policies: u32,
    #[serde(deserialize_with = "amount::flexible")]
    pub total_premium: f64,
    #[serde(deserialize_with = "amount::flexible")]
    pub total_coverage: f64,
}
