use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::aggregator::{
    AggregationSettings, DEFAULT_DIMENSION, DEFAULT_MAX_RESULTS, DEFAULT_METRIC,
};
use crate::models::{EndDate, TimeWindow};
use crate::reporting::google::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub auth: AuthConfig,
    pub analytics: AnalyticsConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Keys accepted on `X-API-Key` for the refresh endpoint; empty disables the check
    #[serde(default)]
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub api_base_url: String,
    /// Falls back to the token saved in the key-value store when unset
    #[serde(default)]
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    pub metric: String,
    pub dimension: String,
    pub max_results: u32,
    /// Public URL of the site, hashed into the API quota identifier
    pub site_url: String,
    pub windows: Vec<TimeWindow>,
    pub end_date: EndDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub const fn default_ttl_secs() -> u64 {
        300
    }

    /// TTL as a signed duration, rejecting values chrono cannot represent
    pub fn ttl(&self) -> anyhow::Result<chrono::Duration> {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .with_context(|| format!("CACHE_TTL_SECS {} is out of range", self.ttl_secs))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::default_ttl_secs(),
        }
    }
}

impl AnalyticsConfig {
    pub fn aggregation_settings(&self) -> AggregationSettings {
        AggregationSettings {
            windows: self.windows.clone(),
            metric: self.metric.clone(),
            dimension: self.dimension.clone(),
            max_results: self.max_results,
            end_date: self.end_date,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            request_timeout_secs: 10,
            metric: DEFAULT_METRIC.to_string(),
            dimension: DEFAULT_DIMENSION.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            site_url: "http://localhost".to_string(),
            windows: TimeWindow::ALL.to_vec(),
            end_date: EndDate::Today,
        }
    }
}

/// Parse a comma-separated window list, dropping duplicates but keeping order
pub fn parse_windows(raw: &str) -> anyhow::Result<Vec<TimeWindow>> {
    let mut windows = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let window = name
            .parse::<TimeWindow>()
            .with_context(|| format!("TOPLYTICS_WINDOWS contains unknown window '{name}'"))?;
        if !windows.contains(&window) {
            windows.push(window);
        }
    }

    if windows.is_empty() {
        anyhow::bail!("TOPLYTICS_WINDOWS must name at least one window");
    }
    Ok(windows)
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parse a numeric setting that must be non-zero, using `default` when unset
fn parse_positive<T>(name: &str, raw: Option<&str>, default: T) -> anyhow::Result<T>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = raw else {
        return Ok(default);
    };

    let value = raw
        .trim()
        .parse::<T>()
        .with_context(|| format!("{name} must be a positive integer, got '{raw}'"))?;
    if value == T::default() {
        anyhow::bail!("{name} must be greater than zero");
    }
    Ok(value)
}

fn positive_env<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_positive(name, std::env::var(name).ok().as_deref(), default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str = env_or("DATABASE_BACKEND", "sqlite");
        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "memory" => DatabaseBackend::Memory,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres, memory"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = env_or("DATABASE_URL", "sqlite://./toplytics.db?mode=rwc");
        let max_connections = positive_env("DATABASE_MAX_CONNECTIONS", 5u32)?;

        let api_host = env_or("API_HOST", "127.0.0.1");
        let api_port = env_or("API_PORT", "8080")
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let api_keys = std::env::var("API_KEYS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let defaults = AnalyticsConfig::default();

        let request_timeout_secs =
            positive_env("GA_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?;
        let max_results = positive_env("GA_MAX_RESULTS", defaults.max_results)?;

        let windows = match std::env::var("TOPLYTICS_WINDOWS") {
            Ok(raw) => parse_windows(&raw)?,
            Err(_) => defaults.windows.clone(),
        };

        let end_date = match env_or("TOPLYTICS_END_DATE", "today").to_lowercase().as_str() {
            "yesterday" => EndDate::Yesterday,
            "today" => EndDate::Today,
            other => {
                tracing::warn!(
                    "Unknown TOPLYTICS_END_DATE '{other}', falling back to 'today'. Supported values: today, yesterday"
                );
                EndDate::Today
            }
        };

        let cache = CacheConfig {
            ttl_secs: positive_env("CACHE_TTL_SECS", CacheConfig::default_ttl_secs())?,
        };
        cache.ttl()?;

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            auth: AuthConfig { api_keys },
            analytics: AnalyticsConfig {
                api_base_url: env_or("GA_API_BASE_URL", &defaults.api_base_url),
                access_token: std::env::var("GA_ACCESS_TOKEN").ok(),
                request_timeout_secs,
                metric: env_or("GA_METRIC", &defaults.metric),
                dimension: env_or("GA_DIMENSION", &defaults.dimension),
                max_results,
                site_url: env_or("TOPLYTICS_SITE_URL", &defaults.site_url),
                windows,
                end_date,
            },
            cache,
        })
    }
}
