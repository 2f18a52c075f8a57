//! Wiring of clients, storage and services, built once per process

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::aggregator::WindowAggregator;
use crate::cache::ResultCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{AnalyticsConfig, CacheConfig, Config};
use crate::profile::ProfileStore;
use crate::reporting::{GoogleAnalyticsClient, ManagementClient, ReportingClient};
use crate::resolver::AccountResolver;
use crate::storage::{self, KeyValueStore};

pub struct AppContext {
    store: Arc<dyn KeyValueStore>,
    management: Arc<dyn ManagementClient>,
    clock: Arc<dyn Clock>,
    profiles: ProfileStore,
    cache: Arc<ResultCache>,
}

impl AppContext {
    pub fn new(
        reporting: Arc<dyn ReportingClient>,
        management: Arc<dyn ManagementClient>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        analytics: &AnalyticsConfig,
        cache: &CacheConfig,
    ) -> Result<Self> {
        let ttl = cache.ttl()?;
        let profiles = ProfileStore::new(Arc::clone(&store));
        let aggregator = WindowAggregator::new(
            reporting,
            analytics.aggregation_settings(),
            &analytics.site_url,
        );
        let cache = Arc::new(ResultCache::new(
            aggregator,
            profiles.clone(),
            Arc::clone(&store),
            Arc::clone(&clock),
            ttl,
        ));

        Ok(Self {
            store,
            management,
            clock,
            profiles,
            cache,
        })
    }

    /// Connect storage and build the Google Analytics client from configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = storage::connect(&config.database).await?;
        let profiles = ProfileStore::new(Arc::clone(&store));

        let token = match config.analytics.access_token.clone() {
            Some(token) => token,
            None => profiles.access_token().await?.context(
                "no access token: set GA_ACCESS_TOKEN or run `toplytics-admin set-token`",
            )?,
        };

        let client = Arc::new(
            GoogleAnalyticsClient::new(
                &config.analytics.api_base_url,
                token,
                std::time::Duration::from_secs(config.analytics.request_timeout_secs),
            )
            .context("failed to build analytics API client")?,
        );

        info!(
            "Analytics client ready (windows: {:?}, ttl: {}s)",
            config.analytics.windows, config.cache.ttl_secs
        );

        Self::new(
            client.clone(),
            client,
            store,
            Arc::new(SystemClock),
            &config.analytics,
            &config.cache,
        )
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn resolver(&self) -> AccountResolver {
        AccountResolver::new(Arc::clone(&self.management))
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
