//! REST API client module for the insurance portal backend.
//!
//! This module provides the `ApiClient` for the dashboard, policy, catalog
//! and asset endpoints, and the `ApiError` classification of failures.
//!
//! Requests carry an optional bearer token; obtaining and refreshing that
//! token is the caller's business.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::ApiError;
