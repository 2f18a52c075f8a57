use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ToplyticsError;

/// Named rolling date range that rankings are computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "2weeks")]
    TwoWeeks,
    #[serde(rename = "month")]
    Month,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 4] = [
        TimeWindow::Today,
        TimeWindow::Week,
        TimeWindow::TwoWeeks,
        TimeWindow::Month,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Today => "today",
            TimeWindow::Week => "week",
            TimeWindow::TwoWeeks => "2weeks",
            TimeWindow::Month => "month",
        }
    }

    /// Number of days the window reaches back from its end date
    pub fn lookback_days(&self) -> i64 {
        match self {
            TimeWindow::Today => 1,
            TimeWindow::Week => 7,
            TimeWindow::TwoWeeks => 14,
            TimeWindow::Month => 30,
        }
    }

    /// `[start, end)` for this window, ending at `end`
    pub fn date_range(&self, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        (end - Duration::days(self.lookback_days()), end)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = ToplyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeWindow::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| ToplyticsError::UnknownWindow(s.to_string()))
    }
}

/// Which day every window's date range ends on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndDate {
    #[default]
    Today,
    Yesterday,
}

impl EndDate {
    pub fn resolve(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = now.date_naive();
        match self {
            EndDate::Today => today,
            EndDate::Yesterday => today - Duration::days(1),
        }
    }
}

/// A single `(page path, page views)` row of a window's ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub path: String,
    pub views: u64,
}

impl RankingEntry {
    pub fn new(path: impl Into<String>, views: u64) -> Self {
        Self {
            path: path.into(),
            views,
        }
    }
}

/// Rankings for every configured window, produced by one aggregation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub view_id: String,
    pub computed_at: DateTime<Utc>,
    pub rankings: BTreeMap<TimeWindow, Vec<RankingEntry>>,
}

impl AggregationResult {
    pub fn ranking(&self, window: TimeWindow) -> Option<&[RankingEntry]> {
        self.rankings.get(&window).map(Vec::as_slice)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.computed_at < ttl
    }

    /// True when every window in `windows` has a ranking
    pub fn covers(&self, windows: &[TimeWindow]) -> bool {
        windows.iter().all(|w| self.rankings.contains_key(w))
    }
}
