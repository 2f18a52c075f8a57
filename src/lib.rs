pub mod aggregator;
pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod profile;
pub mod reporting;
pub mod resolver;
pub mod storage;

pub use cache::ResultCache;
pub use context::AppContext;
pub use error::{ToplyticsError, ToplyticsResult};
