use serde::{Deserialize, Serialize};

/// One queryable analytics view (profile) with its denormalized parents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub view_id: String,
    pub account_id: String,
    pub account_name: String,
    /// Web property id, which doubles as the tracking id
    pub property_id: String,
    pub property_name: String,
    pub view_name: String,
}

impl View {
    /// Human readable label used when listing views to an operator
    pub fn label(&self) -> String {
        format!(
            "{} > {} ({}) > {}",
            self.account_name, self.property_name, self.property_id, self.view_name
        )
    }
}
