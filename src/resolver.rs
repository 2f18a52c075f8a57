//! Discovery of the views (profiles) available to the authorized user

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{HierarchyLevel, ToplyticsError, ToplyticsResult};
use crate::models::View;
use crate::reporting::{ManagementClient, ManagementItem};

pub struct AccountResolver {
    client: Arc<dyn ManagementClient>,
}

impl AccountResolver {
    pub fn new(client: Arc<dyn ManagementClient>) -> Self {
        Self { client }
    }

    /// Walk accounts → web properties → views and flatten the result.
    ///
    /// An empty level anywhere in the walk is a hard failure, since a user
    /// without views cannot be configured. Remote errors are not retried.
    pub async fn list_views(&self) -> ToplyticsResult<Vec<View>> {
        let accounts = non_empty(self.client.list_accounts().await?, HierarchyLevel::Accounts)?;

        let mut views: Vec<View> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for account in &accounts {
            let properties = non_empty(
                self.client.list_web_properties(&account.id).await?,
                HierarchyLevel::WebProperties,
            )?;

            for property in &properties {
                let profiles = non_empty(
                    self.client.list_views(&account.id, &property.id).await?,
                    HierarchyLevel::Views,
                )?;

                for profile in profiles {
                    let view = View {
                        view_id: profile.id,
                        account_id: account.id.clone(),
                        account_name: account.name.clone(),
                        property_id: property.id.clone(),
                        property_name: property.name.clone(),
                        view_name: profile.name,
                    };

                    match positions.get(&view.view_id) {
                        Some(&index) => views[index] = view,
                        None => {
                            positions.insert(view.view_id.clone(), views.len());
                            views.push(view);
                        }
                    }
                }
            }
        }

        info!(
            "Resolved {} views across {} accounts",
            views.len(),
            accounts.len()
        );
        Ok(views)
    }

    /// `(view_id, label)` pairs for presenting a choice to the operator
    pub async fn profile_labels(&self) -> ToplyticsResult<Vec<(String, String)>> {
        Ok(self
            .list_views()
            .await?
            .into_iter()
            .map(|view| {
                let label = view.label();
                (view.view_id, label)
            })
            .collect())
    }
}

fn non_empty(
    items: Vec<ManagementItem>,
    level: HierarchyLevel,
) -> ToplyticsResult<Vec<ManagementItem>> {
    if items.is_empty() {
        debug!("Management API returned no {}", level);
        return Err(ToplyticsError::RemoteEmpty(level));
    }
    Ok(items)
}
