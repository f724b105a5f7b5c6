//! Inbound change notifications and outbound domain events.

use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

use super::codec::{self, GroupKey};
use super::params::EmailSearchParams;
use crate::models::{TreeCount, TreeItem};
use crate::store::ArtifactRef;

/// Batch of artifacts reported by one ingest module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDataEvent {
    /// Artifact type the batch was posted for; unset for mixed batches.
    #[serde(default)]
    pub artifact_type_id: Option<i32>,
    pub artifacts: Vec<ArtifactRef>,
}

/// Notification delivered by the ingest pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeEvent {
    DataAdded(ModuleDataEvent),
    /// Ingest finished; every pending count can be confirmed.
    IngestComplete,
}

/// A concrete (data source, account, folder) that gained messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailEvent {
    pub data_source_id: i64,
    pub account: Option<String>,
    pub folder: Option<String>,
}

impl EmailEvent {
    pub fn new(data_source_id: i64, account: Option<String>, folder: Option<String>) -> Self {
        Self {
            data_source_id,
            account,
            folder,
        }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.account.clone(), self.folder.clone())
    }

    /// Folder level tree node for this event.
    pub fn tree_item(&self, count: TreeCount) -> TreeItem {
        TreeItem {
            type_id: EmailSearchParams::TYPE_ID.to_string(),
            search_params: EmailSearchParams::new(
                Some(self.data_source_id),
                self.account.clone(),
                self.folder.clone(),
            ),
            id: self.group_key().path_key(),
            display_name: codec::folder_display_name(self.folder.as_deref()),
            count,
        }
    }
}

/// Tree node update.
///
/// The item's count is always [`TreeCount::Indeterminate`]: the event never
/// carries a confirmed number. With `immediate` unset the node shows the
/// pending state until it is next viewed. With `immediate` set the pending
/// state is over and the count must be re-fetched now through
/// `EmailsDao::fetch_group_counts`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeEvent {
    pub item: TreeItem,
    pub immediate: bool,
}

impl TreeEvent {
    pub fn new(item: TreeItem, immediate: bool) -> Self {
        Self { item, immediate }
    }

    /// A change to `event`'s group is known but not yet counted.
    pub fn pending(event: &EmailEvent) -> Self {
        Self::new(event.tree_item(TreeCount::Indeterminate), false)
    }

    /// `event`'s group is settled; its count must be fetched again.
    pub fn refetch(event: &EmailEvent) -> Self {
        Self::new(event.tree_item(TreeCount::Indeterminate), true)
    }

    /// Whether the receiver must re-fetch the count now.
    pub fn requires_refetch(&self) -> bool {
        self.immediate
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    GroupChanged(EmailEvent),
    TreeRefresh(TreeEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_event_json_shape() {
        let event: ChangeEvent = serde_json::from_value(serde_json::json!({
            "type": "dataAdded",
            "artifactTypeId": 13,
            "artifacts": [{"artifactId": 5, "artifactTypeId": 13, "dataSourceId": 1}]
        }))
        .expect("valid change event");

        assert_eq!(
            event,
            ChangeEvent::DataAdded(ModuleDataEvent {
                artifact_type_id: Some(13),
                artifacts: vec![ArtifactRef {
                    artifact_id: 5,
                    artifact_type_id: 13,
                    data_source_id: 1,
                }],
            })
        );

        let done: ChangeEvent =
            serde_json::from_value(serde_json::json!({"type": "ingestComplete"})).expect("valid");
        assert_eq!(done, ChangeEvent::IngestComplete);
    }

    #[test]
    fn tree_item_uses_folder_display_name() {
        let item = EmailEvent::new(2, Some("bob".to_string()), None).tree_item(TreeCount::Indeterminate);
        assert_eq!(item.id, "bob/");
        assert_eq!(item.display_name, "Default");
        assert_eq!(item.search_params.data_source_id(), Some(2));
    }
}
