//! Multi-window page view aggregation against a single view

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ToplyticsResult;
use crate::models::{AggregationResult, EndDate, RankingEntry, TimeWindow};
use crate::reporting::{MetricSort, ReportQuery, ReportingClient};

pub const DEFAULT_METRIC: &str = "ga:pageviews";
pub const DEFAULT_DIMENSION: &str = "ga:pagePath";
pub const DEFAULT_MAX_RESULTS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSettings {
    pub windows: Vec<TimeWindow>,
    pub metric: String,
    pub dimension: String,
    pub max_results: u32,
    pub end_date: EndDate,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            windows: TimeWindow::ALL.to_vec(),
            metric: DEFAULT_METRIC.to_string(),
            dimension: DEFAULT_DIMENSION.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            end_date: EndDate::Today,
        }
    }
}

/// Stable per-deployment quota identifier derived from the site's public URL
pub fn quota_user_for(site_url: &str) -> String {
    let digest = Sha256::digest(site_url.trim_end_matches('/').as_bytes());
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}

pub struct WindowAggregator {
    client: Arc<dyn ReportingClient>,
    settings: AggregationSettings,
    quota_user: String,
}

impl WindowAggregator {
    pub fn new(client: Arc<dyn ReportingClient>, settings: AggregationSettings, site_url: &str) -> Self {
        Self {
            client,
            settings,
            quota_user: quota_user_for(site_url),
        }
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.settings.windows
    }

    fn query_for(&self, view_id: &str, window: TimeWindow, now: DateTime<Utc>) -> ReportQuery {
        let (start_date, end_date) = window.date_range(self.settings.end_date.resolve(now));
        ReportQuery {
            view_id: view_id.to_string(),
            start_date,
            end_date,
            metric: self.settings.metric.clone(),
            dimension: self.settings.dimension.clone(),
            sort: MetricSort::Descending,
            max_results: self.settings.max_results,
            quota_user: self.quota_user.clone(),
        }
    }

    /// Query every configured window and build one complete result.
    ///
    /// Rows are kept exactly as the API ordered them. The first failing
    /// window aborts the pass and nothing partial is returned.
    pub async fn aggregate(
        &self,
        view_id: &str,
        now: DateTime<Utc>,
    ) -> ToplyticsResult<AggregationResult> {
        let mut rankings = BTreeMap::new();

        for &window in &self.settings.windows {
            let query = self.query_for(view_id, window, now);
            debug!(
                "Querying {} for view {} ({} to {})",
                window, view_id, query.start_date, query.end_date
            );

            let rows = self.client.query(&query).await.inspect_err(|e| {
                warn!("Query for window {} failed: {}", window, e);
            })?;

            let entries = rows
                .into_iter()
                .map(|(path, views)| RankingEntry { path, views })
                .collect::<Vec<_>>();
            rankings.insert(window, entries);
        }

        info!(
            "Aggregated {} windows for view {}",
            rankings.len(),
            view_id
        );

        Ok(AggregationResult {
            view_id: view_id.to_string(),
            computed_at: now,
            rankings,
        })
    }
}
