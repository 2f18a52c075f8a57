//! Remote analytics API seams
//!
//! The rest of the crate talks to the analytics provider only through the
//! [`ReportingClient`] and [`ManagementClient`] traits, so tests can swap in
//! fakes and the HTTP implementation stays in [`google`].

pub mod google;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

pub use google::GoogleAnalyticsClient;

#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

pub type ReportingResult<T> = Result<T, ReportingError>;

/// Sort direction applied to the queried metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSort {
    Descending,
    Ascending,
}

/// One report request: a metric broken down by a dimension over a date range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub view_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metric: String,
    pub dimension: String,
    pub sort: MetricSort,
    pub max_results: u32,
    /// Spreads API quota across deployments sharing one key; not used for auth
    pub quota_user: String,
}

/// Raw `(dimension value, metric value)` row as returned by the API
pub type ReportRow = (String, u64);

/// An `(id, name)` pair from one level of the management hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementItem {
    pub id: String,
    pub name: String,
}

impl ManagementItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
pub trait ReportingClient: Send + Sync {
    /// Run one report query, returning rows in the API's order
    async fn query(&self, query: &ReportQuery) -> ReportingResult<Vec<ReportRow>>;
}

#[async_trait]
pub trait ManagementClient: Send + Sync {
    async fn list_accounts(&self) -> ReportingResult<Vec<ManagementItem>>;

    async fn list_web_properties(&self, account_id: &str) -> ReportingResult<Vec<ManagementItem>>;

    async fn list_views(
        &self,
        account_id: &str,
        property_id: &str,
    ) -> ReportingResult<Vec<ManagementItem>>;
}
