//! Data models for the insurance portal API.
//!
//! This module contains the payload types returned by the backend:
//!
//! - `DashboardData` and its parts: the customer overview page
//! - `Policy`, `PolicyDetail`: the signed-in user's own policies
//! - Catalog types: `PolicyCategory`, `InsuranceCompany`, `PolicyType`, reviews
//! - `Asset`: vehicles, property and businesses the user has registered
//!
//! Types use `#[serde(default)]` liberally; the backend omits empty fields.

mod amount;
pub mod asset;
pub mod catalog;
pub mod dashboard;
pub mod list;
pub mod policy;

pub use asset::{Asset, AssetPatch, AssetType, CreateAssetInput, LOCAL_ASSET_OWNER};
pub use catalog::{
    InsuranceCompany, NewPolicyReview, PolicyCategory, PolicyReview, PolicyType,
    PolicyTypeDetail, PolicyTypeFilters, RefSummary,
};
pub use dashboard::{
    ActivityEvent, DashboardData, DashboardStats, ExpiringPolicy, Recommendation,
    UpcomingPayment,
};
pub use list::ListResponse;
pub use policy::{Policy, PolicyDetail, PolicyStats, PolicyStatus};
