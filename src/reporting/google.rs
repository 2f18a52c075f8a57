//! Google Analytics v3 (Core Reporting + Management) client over reqwest

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{
    ManagementClient, ManagementItem, MetricSort, ReportQuery, ReportRow, ReportingClient,
    ReportingError, ReportingResult,
};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/analytics/v3";

#[derive(Clone)]
pub struct GoogleAnalyticsClient {
    client: Client,
    base_url: String,
    access_token: String,
    timeout: Duration,
}

impl GoogleAnalyticsClient {
    pub fn new(
        base_url: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> ReportingResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("toplytics/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            timeout,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> ReportingResult<Url> {
        let raw = format!("{}{}", self.base_url, path);
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        url.map_err(|e| ReportingError::InvalidUrl(format!("{raw}: {e}")))
    }

    fn classify(&self, err: reqwest::Error) -> ReportingError {
        if err.is_timeout() {
            ReportingError::Timeout(self.timeout)
        } else if err.is_decode() {
            ReportingError::Malformed(err.to_string())
        } else {
            ReportingError::Transport(err)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ReportingResult<T> {
        debug!("GET {}", url.path());

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(ReportingError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| self.classify(e))
    }

    /// Fetch every page of a management listing by following `nextLink`
    async fn list_all(&self, path: &str) -> ReportingResult<Vec<ManagementItem>> {
        let mut url = self.endpoint(path, &[])?;
        let mut items = Vec::new();

        loop {
            let page: ManagementList = self.get_json(url.clone()).await?;
            items.extend(
                page.items
                    .into_iter()
                    .map(|item| ManagementItem::new(item.id, item.name)),
            );

            let Some(next) = page.next_link else {
                break;
            };
            let next = Url::parse(&next)
                .map_err(|e| ReportingError::Malformed(format!("invalid nextLink '{next}': {e}")))?;
            if next == url {
                break;
            }
            url = next;
        }

        Ok(items)
    }
}

/// Prefix a bare view id with the `ga:` table namespace
fn table_id(view_id: &str) -> String {
    if view_id.starts_with("ga:") {
        view_id.to_string()
    } else {
        format!("ga:{view_id}")
    }
}

fn sort_param(metric: &str, sort: MetricSort) -> String {
    match sort {
        MetricSort::Descending => format!("-{metric}"),
        MetricSort::Ascending => metric.to_string(),
    }
}

fn query_params(query: &ReportQuery) -> Vec<(&'static str, String)> {
    vec![
        ("ids", table_id(&query.view_id)),
        ("start-date", query.start_date.format("%Y-%m-%d").to_string()),
        ("end-date", query.end_date.format("%Y-%m-%d").to_string()),
        ("metrics", query.metric.clone()),
        ("dimensions", query.dimension.clone()),
        ("sort", sort_param(&query.metric, query.sort)),
        ("max-results", query.max_results.to_string()),
        ("quotaUser", query.quota_user.clone()),
    ]
}

/// Flatten the API's string rows into typed `(dimension, metric)` pairs
fn parse_rows(response: DataResponse) -> ReportingResult<Vec<ReportRow>> {
    response
        .rows
        .into_iter()
        .map(|row| match row.as_slice() {
            [dimension, metric] => metric
                .parse::<u64>()
                .map(|value| (dimension.clone(), value))
                .map_err(|_| {
                    ReportingError::Malformed(format!(
                        "metric value '{metric}' for '{dimension}' is not an integer"
                    ))
                }),
            other => Err(ReportingError::Malformed(format!(
                "expected 2 columns per row, got {}",
                other.len()
            ))),
        })
        .collect()
}

#[async_trait]
impl ReportingClient for GoogleAnalyticsClient {
    async fn query(&self, query: &ReportQuery) -> ReportingResult<Vec<ReportRow>> {
        let url = self.endpoint("/data/ga", &query_params(query))?;
        let response: DataResponse = self.get_json(url).await?;
        parse_rows(response)
    }
}

#[async_trait]
impl ManagementClient for GoogleAnalyticsClient {
    async fn list_accounts(&self) -> ReportingResult<Vec<ManagementItem>> {
        self.list_all("/management/accounts").await
    }

    async fn list_web_properties(&self, account_id: &str) -> ReportingResult<Vec<ManagementItem>> {
        self.list_all(&format!("/management/accounts/{account_id}/webproperties"))
            .await
    }

    async fn list_views(
        &self,
        account_id: &str,
        property_id: &str,
    ) -> ReportingResult<Vec<ManagementItem>> {
        self.list_all(&format!(
            "/management/accounts/{account_id}/webproperties/{property_id}/profiles"
        ))
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ManagementList {
    #[serde(default)]
    items: Vec<ManagementListItem>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ManagementListItem {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct DataResponse {
    // Omitted by the API when the query matched nothing
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
