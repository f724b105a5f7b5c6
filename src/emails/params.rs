use super::codec::GroupKey;
use super::error::DaoError;
use super::events::DomainEvent;
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Filter for email messages: optional data source plus account/folder.
///
/// Account and folder are either both set (a concrete folder) or both unset
/// (messages whose path does not decode).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailSearchParams {
    data_source_id: Option<i64>,
    account: Option<String>,
    folder: Option<String>,
}

impl EmailSearchParams {
    pub const TYPE_ID: &'static str = "EMAIL_SEARCH_PARAMS";

    pub fn new(data_source_id: Option<i64>, account: Option<String>, folder: Option<String>) -> Self {
        Self {
            data_source_id,
            account,
            folder,
        }
    }

    pub fn data_source_id(&self) -> Option<i64> {
        self.data_source_id
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.account.clone(), self.folder.clone())
    }

    /// Check the filter can be turned into a page query.
    pub fn validate(&self) -> Result<(), DaoError> {
        if let Some(ds) = self.data_source_id.filter(|ds| *ds <= 0) {
            return Err(DaoError::InvalidArgument(format!(
                "data source id must be greater than 0 or unset, got {ds}"
            )));
        }

        if self.account.is_some() != self.folder.is_some() {
            return Err(DaoError::InvalidArgument(format!(
                "account and folder must both be set or both be unset (account: {}, folder: {})",
                self.account.as_deref().unwrap_or("<none>"),
                self.folder.as_deref().unwrap_or("<none>"),
            )));
        }

        Ok(())
    }

    /// Whether a page loaded with these parameters is stale after `event`.
    pub fn is_refresh_required(&self, event: &DomainEvent) -> bool {
        match event {
            DomainEvent::GroupChanged(changed) => {
                self.account == changed.account
                    && self.folder == changed.folder
                    && self
                        .data_source_id
                        .is_none_or(|ds| ds == changed.data_source_id)
            }
            DomainEvent::TreeRefresh(_) => false,
        }
    }
}

/// Cache key: filter parameters plus the requested window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchParams<P> {
    params: P,
    start_item: u64,
    max_count: Option<u64>,
}

impl<P> SearchParams<P> {
    pub fn new(params: P, start_item: u64, max_count: Option<u64>) -> Self {
        Self {
            params,
            start_item,
            max_count,
        }
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn start_item(&self) -> u64 {
        self.start_item
    }

    pub fn max_count(&self) -> Option<u64> {
        self.max_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emails::events::EmailEvent;

    fn folder_params(ds: Option<i64>) -> EmailSearchParams {
        EmailSearchParams::new(ds, Some("bob".to_string()), Some("Inbox".to_string()))
    }

    #[test]
    fn validate_rejects_bad_filters() {
        assert!(folder_params(Some(1)).validate().is_ok());
        assert!(EmailSearchParams::new(None, None, None).validate().is_ok());

        assert!(matches!(
            folder_params(Some(0)).validate(),
            Err(DaoError::InvalidArgument(_))
        ));
        assert!(matches!(
            EmailSearchParams::new(None, Some("bob".to_string()), None).validate(),
            Err(DaoError::InvalidArgument(_))
        ));
        assert!(matches!(
            EmailSearchParams::new(None, None, Some("Inbox".to_string())).validate(),
            Err(DaoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn search_params_compare_structurally() {
        let a = SearchParams::new(folder_params(Some(1)), 0, Some(50));
        let b = SearchParams::new(folder_params(Some(1)), 0, Some(50));
        let c = SearchParams::new(folder_params(Some(1)), 50, Some(50));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn refresh_required_for_matching_group() {
        let event = DomainEvent::GroupChanged(EmailEvent::new(
            1,
            Some("bob".to_string()),
            Some("Inbox".to_string()),
        ));

        assert!(folder_params(Some(1)).is_refresh_required(&event));
        assert!(folder_params(None).is_refresh_required(&event));
        assert!(!folder_params(Some(2)).is_refresh_required(&event));

        let sent = EmailSearchParams::new(None, Some("bob".to_string()), Some("Sent".to_string()));
        assert!(!sent.is_refresh_required(&event));
    }
}
