//! Durable record of which view is queried and of the supplied API token

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ToplyticsError, ToplyticsResult};
use crate::models::View;
use crate::storage::KeyValueStore;

pub const PROFILE_KEY: &str = "toplytics_profile_data";
pub const TOKEN_KEY: &str = "toplytics_oauth_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedProfile {
    pub view: View,
    /// Display label captured at selection time
    pub info: String,
    pub selected_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn select(&self, view: &View, now: DateTime<Utc>) -> ToplyticsResult<SelectedProfile> {
        let selected = SelectedProfile {
            info: view.label(),
            view: view.clone(),
            selected_at: now,
        };
        let json = serde_json::to_string(&selected).context("failed to encode profile data")?;
        self.store.set(PROFILE_KEY, &json).await?;

        info!("Selected view {} ({})", view.view_id, selected.info);
        Ok(selected)
    }

    /// The current selection, if any. Undecodable data counts as no selection.
    pub async fn selected(&self) -> ToplyticsResult<Option<SelectedProfile>> {
        let Some(raw) = self.store.get(PROFILE_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<SelectedProfile>(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!("Ignoring undecodable profile data: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn selected_view_id(&self) -> ToplyticsResult<String> {
        self.selected()
            .await?
            .map(|profile| profile.view.view_id)
            .ok_or(ToplyticsError::NoSelectedView)
    }

    pub async fn clear(&self) -> ToplyticsResult<bool> {
        Ok(self.store.delete(PROFILE_KEY).await?)
    }

    pub async fn access_token(&self) -> ToplyticsResult<Option<String>> {
        Ok(self.store.get(TOKEN_KEY).await?)
    }

    pub async fn save_access_token(&self, token: &str) -> ToplyticsResult<()> {
        Ok(self.store.set(TOKEN_KEY, token).await?)
    }

    /// Forget both the stored token and the selected view
    pub async fn remove_credentials(&self) -> ToplyticsResult<()> {
        self.store.delete(TOKEN_KEY).await?;
        self.store.delete(PROFILE_KEY).await?;
        info!("Removed stored credentials and profile selection");
        Ok(())
    }
}
