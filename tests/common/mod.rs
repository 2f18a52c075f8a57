//! Fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use toplytics::clock::ManualClock;
use toplytics::config::{AnalyticsConfig, CacheConfig};
use toplytics::models::{TimeWindow, View};
use toplytics::reporting::{
    ManagementClient, ManagementItem, ReportQuery, ReportRow, ReportingClient, ReportingError,
    ReportingResult,
};
use toplytics::storage::{KeyValueStore, MemoryStore};
use toplytics::AppContext;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn rows(pairs: &[(&str, u64)]) -> Vec<ReportRow> {
    pairs.iter().map(|(p, v)| (p.to_string(), *v)).collect()
}

/// Window a query was issued for, recovered from its date span
pub fn window_of(query: &ReportQuery) -> TimeWindow {
    let days = (query.end_date - query.start_date).num_days();
    TimeWindow::ALL
        .into_iter()
        .find(|w| w.lookback_days() == days)
        .expect("query span matches a known window")
}

/// Call-counting reporting client with scripted per-window rows
#[derive(Default)]
pub struct FakeReportingClient {
    responses: Mutex<HashMap<TimeWindow, Vec<ReportRow>>>,
    calls: AtomicUsize,
    fail_at_call: Mutex<Option<usize>>,
    fail_all: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl FakeReportingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, window: TimeWindow, rows: Vec<ReportRow>) {
        self.responses.lock().unwrap().insert(window, rows);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fail the `n`th query issued from now on (1-based)
    pub fn fail_nth_from_now(&self, n: usize) {
        *self.fail_at_call.lock().unwrap() = Some(self.calls() + n);
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl ReportingClient for FakeReportingClient {
    async fn query(&self, query: &ReportQuery) -> ReportingResult<Vec<ReportRow>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fail_at = *self.fail_at_call.lock().unwrap();
        if self.fail_all.load(Ordering::SeqCst) || fail_at == Some(call) {
            return Err(ReportingError::Status {
                status: 503,
                message: "backend error".to_string(),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&window_of(query))
            .cloned()
            .unwrap_or_default())
    }
}

pub type Properties = Vec<(ManagementItem, Vec<ManagementItem>)>;

/// Scripted account → property → view hierarchy
#[derive(Default)]
pub struct FakeManagementClient {
    pub accounts: Vec<(ManagementItem, Properties)>,
    pub view_list_calls: AtomicUsize,
    pub fail_accounts: bool,
}

impl FakeManagementClient {
    pub fn new(accounts: Vec<(ManagementItem, Properties)>) -> Self {
        Self {
            accounts,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ManagementClient for FakeManagementClient {
    async fn list_accounts(&self) -> ReportingResult<Vec<ManagementItem>> {
        if self.fail_accounts {
            return Err(ReportingError::Status {
                status: 403,
                message: "User does not have any Google Analytics account.".to_string(),
            });
        }
        Ok(self.accounts.iter().map(|(a, _)| a.clone()).collect())
    }

    async fn list_web_properties(&self, account_id: &str) -> ReportingResult<Vec<ManagementItem>> {
        Ok(self
            .accounts
            .iter()
            .find(|(a, _)| a.id == account_id)
            .map(|(_, props)| props.iter().map(|(p, _)| p.clone()).collect())
            .unwrap_or_default())
    }

    async fn list_views(
        &self,
        account_id: &str,
        property_id: &str,
    ) -> ReportingResult<Vec<ManagementItem>> {
        self.view_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .accounts
            .iter()
            .find(|(a, _)| a.id == account_id)
            .and_then(|(_, props)| props.iter().find(|(p, _)| p.id == property_id))
            .map(|(_, views)| views.clone())
            .unwrap_or_default())
    }
}

pub fn view(view_id: &str) -> View {
    View {
        view_id: view_id.to_string(),
        account_id: "100".to_string(),
        account_name: "Acme".to_string(),
        property_id: "UA-100-1".to_string(),
        property_name: "acme.com".to_string(),
        view_name: "All Web Site Data".to_string(),
    }
}

pub struct Harness {
    pub client: Arc<FakeReportingClient>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub context: AppContext,
}

/// Context over fakes with `windows` configured and a 300 s TTL
pub fn harness_with_store(windows: &[TimeWindow], store: Arc<MemoryStore>) -> Harness {
    let client = FakeReportingClient::new();
    let clock = Arc::new(ManualClock::new(t0()));
    let analytics = AnalyticsConfig {
        windows: windows.to_vec(),
        site_url: "https://blog.example.com".to_string(),
        ..Default::default()
    };

    let context = AppContext::new(
        client.clone(),
        Arc::new(FakeManagementClient::default()),
        store.clone() as Arc<dyn KeyValueStore>,
        clock.clone(),
        &analytics,
        &CacheConfig { ttl_secs: 300 },
    )
    .unwrap();

    Harness {
        client,
        clock,
        store,
        context,
    }
}

pub fn harness(windows: &[TimeWindow]) -> Harness {
    harness_with_store(windows, Arc::new(MemoryStore::new()))
}

/// Harness with view "42" already selected
pub async fn selected_harness(windows: &[TimeWindow]) -> Harness {
    let h = harness(windows);
    h.context.profiles().select(&view("42"), t0()).await.unwrap();
    h
}
