//! Time-boxed cache in front of the window aggregator
//!
//! Reads are served from one shared [`AggregationResult`] slot. A read that
//! finds the slot empty or older than the TTL refreshes it through the
//! aggregator; when that refresh fails with a remote error the previous
//! (expired) result is served instead. Refreshes are serialized behind a
//! single async mutex. A reader that waited on it re-checks freshness, and if
//! an attempt completed meanwhile it serves whatever that attempt left behind,
//! so a burst of stale reads turns into one remote call sequence even while
//! the API is failing.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::aggregator::WindowAggregator;
use crate::clock::Clock;
use crate::error::{ToplyticsError, ToplyticsResult};
use crate::models::{AggregationResult, RankingEntry, TimeWindow};
use crate::profile::ProfileStore;
use crate::storage::KeyValueStore;

pub const CACHE_KEY: &str = "toplytics_cached_results";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CacheState {
    Empty,
    Fresh { computed_at: DateTime<Utc> },
    Stale { computed_at: DateTime<Utc> },
}

pub struct ResultCache {
    aggregator: WindowAggregator,
    profiles: ProfileStore,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    slot: RwLock<Option<Arc<AggregationResult>>>,
    /// Set once the slot has been loaded from the key-value store
    hydrated: OnceCell<()>,
    refresh_lock: Mutex<()>,
    /// Completed refresh attempts, successful or not
    attempts: AtomicU64,
}

impl ResultCache {
    pub fn new(
        aggregator: WindowAggregator,
        profiles: ProfileStore,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            aggregator,
            profiles,
            store,
            clock,
            ttl,
            slot: RwLock::new(None),
            hydrated: OnceCell::new(),
            refresh_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn windows(&self) -> &[TimeWindow] {
        self.aggregator.windows()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Ranking for `window_name`, refreshing first when the slot is empty or stale
    pub async fn get_ranking(&self, window_name: &str) -> ToplyticsResult<Vec<RankingEntry>> {
        let window = self.resolve_window(window_name)?;

        if let Some(result) = self.fresh_snapshot().await {
            debug!("Serving {} from cache", window);
            return Ok(entries(&result, window));
        }

        let attempts_seen = self.attempts.load(Ordering::SeqCst);
        let _guard = self.refresh_lock.lock().await;

        // Another reader may have finished a refresh while this one waited
        if let Some(result) = self.fresh_snapshot().await {
            debug!("Serving {} from cache refreshed by a concurrent read", window);
            return Ok(entries(&result, window));
        }

        let view_id = self.profiles.selected_view_id().await?;
        let previous = self
            .snapshot()
            .await
            .filter(|result| result.view_id == view_id);

        // An attempt finished while this reader waited and left no fresh data
        if self.attempts.load(Ordering::SeqCst) != attempts_seen {
            debug!("Concurrent refresh failed, not retrying for {}", window);
            return previous
                .map(|stale| entries(&stale, window))
                .ok_or(ToplyticsError::NoCachedData);
        }

        match self.refresh_for(&view_id).await {
            Ok(result) => Ok(entries(&result, window)),
            Err(e) if e.is_recoverable() => match previous {
                Some(stale) => {
                    warn!(
                        "Refresh failed, serving rankings computed at {}: {}",
                        stale.computed_at, e
                    );
                    Ok(entries(&stale, window))
                }
                None => {
                    warn!("Refresh failed and no earlier rankings exist: {}", e);
                    Err(ToplyticsError::NoCachedData)
                }
            },
            Err(e) => Err(e),
        }
    }

    /// Refresh regardless of freshness; concurrent reads wait for it
    pub async fn refresh_now(&self) -> ToplyticsResult<Arc<AggregationResult>> {
        self.hydrate().await;
        let _guard = self.refresh_lock.lock().await;

        let view_id = self.profiles.selected_view_id().await?;
        self.refresh_for(&view_id).await
    }

    /// The stored result regardless of age
    pub async fn snapshot(&self) -> Option<Arc<AggregationResult>> {
        self.hydrate().await;
        self.slot.read().await.clone()
    }

    pub async fn state(&self) -> CacheState {
        match self.snapshot().await {
            None => CacheState::Empty,
            Some(result) if result.is_fresh(self.clock.now(), self.ttl) => CacheState::Fresh {
                computed_at: result.computed_at,
            },
            Some(result) => CacheState::Stale {
                computed_at: result.computed_at,
            },
        }
    }

    fn resolve_window(&self, name: &str) -> ToplyticsResult<TimeWindow> {
        let window = name.parse::<TimeWindow>()?;
        if !self.windows().contains(&window) {
            return Err(ToplyticsError::UnknownWindow(name.to_string()));
        }
        Ok(window)
    }

    async fn fresh_snapshot(&self) -> Option<Arc<AggregationResult>> {
        self.snapshot()
            .await
            .filter(|result| result.is_fresh(self.clock.now(), self.ttl))
    }

    /// Must be called with `refresh_lock` held
    async fn refresh_for(&self, view_id: &str) -> ToplyticsResult<Arc<AggregationResult>> {
        info!("Refreshing rankings for view {}", view_id);
        let outcome = self.aggregator.aggregate(view_id, self.clock.now()).await;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let result = Arc::new(outcome?);

        if let Err(e) = self.persist(&result).await {
            warn!("Failed to persist refreshed rankings: {:#}", e);
        }

        *self.slot.write().await = Some(Arc::clone(&result));
        Ok(result)
    }

    async fn persist(&self, result: &AggregationResult) -> anyhow::Result<()> {
        let json = serde_json::to_string(result).context("failed to encode rankings")?;
        self.store.set(CACHE_KEY, &json).await
    }

    async fn hydrate(&self) {
        self.hydrated
            .get_or_init(|| async {
                match self.load_persisted().await {
                    Ok(Some(result)) => {
                        let mut slot = self.slot.write().await;
                        if slot.is_none() {
                            debug!("Loaded rankings computed at {}", result.computed_at);
                            *slot = Some(Arc::new(result));
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Ignoring persisted rankings: {:#}", e),
                }
            })
            .await;
    }

    async fn load_persisted(&self) -> anyhow::Result<Option<AggregationResult>> {
        let Some(raw) = self.store.get(CACHE_KEY).await? else {
            return Ok(None);
        };

        let result: AggregationResult =
            serde_json::from_str(&raw).context("failed to decode persisted rankings")?;

        // A result missing a configured window predates a config change
        if !result.covers(self.windows()) {
            debug!("Persisted rankings do not cover the configured windows");
            return Ok(None);
        }
        Ok(Some(result))
    }
}

fn entries(result: &AggregationResult, window: TimeWindow) -> Vec<RankingEntry> {
    result.ranking(window).map(<[_]>::to_vec).unwrap_or_default()
}
