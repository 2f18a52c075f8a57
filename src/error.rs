use std::fmt;
use thiserror::Error;

use crate::reporting::ReportingError;

/// Level of the account → web property → view hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyLevel {
    Accounts,
    WebProperties,
    Views,
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HierarchyLevel::Accounts => "accounts",
            HierarchyLevel::WebProperties => "web properties",
            HierarchyLevel::Views => "views (profiles)",
        })
    }
}

#[derive(Debug, Error)]
pub enum ToplyticsError {
    #[error("analytics API unavailable: {0}")]
    RemoteUnavailable(#[from] ReportingError),
    #[error("no {0} found for this user")]
    RemoteEmpty(HierarchyLevel),
    #[error("no analytics view has been selected")]
    NoSelectedView,
    #[error("no analytics data available yet")]
    NoCachedData,
    #[error("unknown time window '{0}'")]
    UnknownWindow(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ToplyticsError {
    /// Whether a read may fall back to stale data instead of surfacing this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ToplyticsError::RemoteUnavailable(_))
    }
}

pub type ToplyticsResult<T> = Result<T, ToplyticsError>;
