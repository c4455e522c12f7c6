//! Policy catalog: categories, insurers, policy types and reviews.
//!
//! Every read goes through a [`KeyedTtlCache`], one per payload type. Listing
//! calls that take filters are keyed by their canonical parameters, so
//! `{category, search}` and `{search, category}` share an entry while
//! different filter values never do.

use std::time::Duration;

use futures::future::join_all;
use serde_json::{Map, Value};

use crate::api::{ApiClient, ApiError};
use crate::cache::{CacheKey, KeyedTtlCache};
use crate::models::{
    InsuranceCompany, NewPolicyReview, PolicyCategory, PolicyReview, PolicyType,
    PolicyTypeDetail, PolicyTypeFilters,
};

const CATEGORIES: &str = "policies/categories";
const COMPANIES: &str = "policies/companies";
const TYPES: &str = "policies/types";
const FEATURED_TYPES: &str = "policies/types/featured";
const REVIEWS: &str = "policies/reviews";

#[derive(Clone)]
pub struct CatalogService {
    api: ApiClient,
    ttl: Duration,
    categories: KeyedTtlCache<Vec<PolicyCategory>>,
    category: KeyedTtlCache<PolicyCategory>,
    companies: KeyedTtlCache<Vec<InsuranceCompany>>,
    company: KeyedTtlCache<InsuranceCompany>,
    types: KeyedTtlCache<Vec<PolicyType>>,
    type_detail: KeyedTtlCache<PolicyTypeDetail>,
    reviews: KeyedTtlCache<Vec<PolicyReview>>,
}

impl CatalogService {
    pub fn new(api: ApiClient, ttl: Duration) -> Self {
        Self {
            api,
            ttl,
            categories: KeyedTtlCache::new(ttl),
            category: KeyedTtlCache::new(ttl),
            companies: KeyedTtlCache::new(ttl),
            company: KeyedTtlCache::new(ttl),
            types: KeyedTtlCache::new(ttl),
            type_detail: KeyedTtlCache::new(ttl),
            reviews: KeyedTtlCache::new(ttl),
        }
    }

    pub async fn get_categories(&self) -> Result<Vec<PolicyCategory>, ApiError> {
        let api = self.api.clone();
        self.categories
            .get_or_fetch(CacheKey::new(CATEGORIES), self.ttl, false, move || async move {
                api.fetch_categories().await
            })
            .await
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<PolicyCategory, ApiError> {
        let api = self.api.clone();
        let slug = slug.to_string();
        self.category
            .get_or_fetch(single_param(CATEGORIES, "slug", &slug), self.ttl, false, move || async move {
                api.fetch_category(&slug).await
            })
            .await
    }

    pub async fn get_insurance_companies(&self) -> Result<Vec<InsuranceCompany>, ApiError> {
        let api = self.api.clone();
        self.companies
            .get_or_fetch(CacheKey::new(COMPANIES), self.ttl, false, move || async move {
                api.fetch_companies().await
            })
            .await
    }

    pub async fn get_company_by_id(&self, id: &str) -> Result<InsuranceCompany, ApiError> {
        let api = self.api.clone();
        let id = id.to_string();
        self.company
            .get_or_fetch(single_param(COMPANIES, "id", &id), self.ttl, false, move || async move {
                api.fetch_company(&id).await
            })
            .await
    }

    pub async fn get_policy_types(
        &self,
        filters: &PolicyTypeFilters,
    ) -> Result<Vec<PolicyType>, ApiError> {
        let api = self.api.clone();
        let owned = filters.clone();
        self.types
            .get_or_fetch(types_key(filters), self.ttl, false, move || async move {
                api.fetch_policy_types(&owned).await
            })
            .await
    }

    pub async fn get_featured_policies(&self) -> Result<Vec<PolicyType>, ApiError> {
        let api = self.api.clone();
        self.types
            .get_or_fetch(CacheKey::new(FEATURED_TYPES), self.ttl, false, move || async move {
                api.fetch_featured_policy_types().await
            })
            .await
    }

    pub async fn get_policy_type_by_id(&self, id: &str) -> Result<PolicyTypeDetail, ApiError> {
        let api = self.api.clone();
        let id = id.to_string();
        self.type_detail
            .get_or_fetch(single_param(TYPES, "id", &id), self.ttl, false, move || async move {
                api.fetch_policy_type(&id).await
            })
            .await
    }

    pub async fn get_policy_types_by_category(
        &self,
        category_slug: &str,
    ) -> Result<Vec<PolicyType>, ApiError> {
        self.get_policy_types(&PolicyTypeFilters::category(category_slug))
            .await
    }

    pub async fn search_policy_types(&self, query: &str) -> Result<Vec<PolicyType>, ApiError> {
        self.get_policy_types(&PolicyTypeFilters::search(query)).await
    }

    pub async fn get_policy_reviews(
        &self,
        policy_type_id: &str,
    ) -> Result<Vec<PolicyReview>, ApiError> {
        let api = self.api.clone();
        let id = policy_type_id.to_string();
        self.reviews
            .get_or_fetch(reviews_key(policy_type_id), self.ttl, false, move || async move {
                api.fetch_policy_reviews(&id).await
            })
            .await
    }

    /// Post a review. Drops that policy type's cached reviews and every cached
    /// policy-type listing (ratings feed into them).
    pub async fn submit_policy_review(
        &self,
        review: &NewPolicyReview,
    ) -> Result<PolicyReview, ApiError> {
        let created = self.api.submit_policy_review(review).await?;
        self.reviews.invalidate(&reviews_key(&review.policy_type));
        self.types.invalidate_prefix(TYPES);
        self.type_detail
            .invalidate(&single_param(TYPES, "id", &review.policy_type));
        Ok(created)
    }

    /// Details for several policy types, in the order given.
    /// Fails if any one of them fails.
    pub async fn compare_policies(
        &self,
        ids: &[String],
    ) -> Result<Vec<PolicyTypeDetail>, ApiError> {
        join_all(ids.iter().map(|id| self.get_policy_type_by_id(id)))
            .await
            .into_iter()
            .collect()
    }

    pub fn clear(&self) {
        self.categories.clear();
        self.category.clear();
        self.companies.clear();
        self.company.clear();
        self.types.clear();
        self.type_detail.clear();
        self.reviews.clear();
    }

    /// Purge expired entries from every catalog cache.
    pub fn cleanup(&self) -> usize {
        self.categories.cleanup()
            + self.category.cleanup()
            + self.companies.cleanup()
            + self.company.cleanup()
            + self.types.cleanup()
            + self.type_detail.cleanup()
            + self.reviews.cleanup()
    }

    /// Number of live entries across every catalog cache.
    pub fn cached_entries(&self) -> usize {
        [
            self.categories.stats(),
            self.category.stats(),
            self.companies.stats(),
            self.company.stats(),
            self.types.stats(),
            self.type_detail.stats(),
            self.reviews.stats(),
        ]
        .iter()
        .map(|s| s.size - s.expired)
        .sum()
    }
}

fn single_param(resource: &str, name: &str, value: &str) -> CacheKey {
    let mut params = Map::new();
    params.insert(name.to_string(), Value::String(value.to_string()));
    CacheKey::with_params(resource, &params)
}

fn reviews_key(policy_type_id: &str) -> CacheKey {
    single_param(REVIEWS, "policy_type", policy_type_id)
}

/// Canonical key for a filtered listing. Unset filters are left out.
fn types_key(filters: &PolicyTypeFilters) -> CacheKey {
    let mut params = Map::new();
    let mut put = |name: &str, value: Option<Value>| {
        if let Some(value) = value {
            params.insert(name.to_string(), value);
        }
    };
    put("category", filters.category.clone().map(Value::from));
    put("min_price", filters.min_price.map(Value::from));
    put("max_price", filters.max_price.map(Value::from));
    put("company", filters.company.clone().map(Value::from));
    put("featured", filters.featured.map(Value::from));
    put("search", filters.search.clone().map(Value::from));
    CacheKey::with_params(TYPES, &params)
}
