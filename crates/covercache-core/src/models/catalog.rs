use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::amount;

/// A nested `{id, name, ...}` reference to another record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCategory {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub policy_count: u32,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceCompany {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default, deserialize_with = "amount::flexible_opt")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A purchasable insurance product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyType {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub category: RefSummary,
    pub insurance_company: RefSummary,
    #[serde(deserialize_with = "amount::flexible")]
    pub base_premium: f64,
    #[serde(default, deserialize_with = "amount::flexible_opt")]
    pub min_coverage_amount: Option<f64>,
    #[serde(default, deserialize_with = "amount::flexible_opt")]
    pub max_coverage_amount: Option<f64>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub terms_and_conditions: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTypeDetail {
    #[serde(flatten)]
    pub policy_type: PolicyType,
    #[serde(default)]
    pub coverage_details: Option<Value>,
    #[serde(default)]
    pub required_documents: Vec<String>,
    #[serde(default)]
    pub eligibility_criteria: Vec<String>,
    #[serde(default)]
    pub claim_process: Vec<String>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyReview {
    pub id: String,
    pub user: RefSummary,
    pub policy_type: String,
    pub rating: u8,
    pub review: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body for `POST policies/reviews/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPolicyReview {
    pub policy_type: String,
    pub rating: u8,
    pub review: String,
}

/// Query filters for `policies/types/`.
///
/// Unset fields are left out of the query string and out of the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyTypeFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl PolicyTypeFilters {
    pub fn category(slug: impl Into<String>) -> Self {
        Self {
            category: Some(slug.into()),
            ..Self::default()
        }
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self {
            search: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_type_decimal_strings() {
        let json = r#"{
            "id": "t-1",
            "name": "Comprehensive Motor",
            "slug": "comprehensive-motor",
            "category": {"id": "cat-1", "name": "Motor", "slug": "motor"},
            "insurance_company": {"id": "c-1", "name": "Jubilee"},
            "base_premium": "25000.00",
            "max_coverage_amount": "5000000.00",
            "features": ["Windscreen cover"],
            "is_featured": true
        }"#;
        let policy_type: PolicyType = serde_json::from_str(json).unwrap();
        assert_eq!(policy_type.base_premium, 25_000.0);
        assert_eq!(policy_type.min_coverage_amount, None);
        assert_eq!(policy_type.max_coverage_amount, Some(5_000_000.0));
        assert!(policy_type.is_active);
    }

    #[test]
    fn test_filters_skip_unset_fields() {
        let filters = PolicyTypeFilters {
            category: Some("motor".into()),
            featured: Some(true),
            ..Default::default()
        };
        let value = serde_json::to_value(&filters).unwrap();
        assert_eq!(value, serde_json::json!({"category": "motor", "featured": true}));
        assert!(PolicyTypeFilters::default().is_empty());
        assert!(!filters.is_empty());
    }
}
