//! Email message pages and account/folder tree counts.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use super::codec::{self, GroupKey, decode_path};
use super::error::DaoError;
use super::events::{ChangeEvent, DomainEvent, EmailEvent, ModuleDataEvent, TreeEvent};
use super::params::{EmailSearchParams, SearchParams};
use super::query;
use super::table::build_table;
use crate::cache::{PendingCountTracker, ResultCache};
use crate::config::CacheConfig;
use crate::models::{ResultPage, TreeCount, TreeItem};
use crate::store::{ARTIFACT_TYPE_EMAIL_MSG, ATTRIBUTE_TYPE_PATH, Artifact, CaseDatabase, Row};

type PageKey = SearchParams<EmailSearchParams>;

/// account => folder => data source ids
type GroupMap = BTreeMap<Option<String>, BTreeMap<Option<String>, BTreeSet<i64>>>;

/// Cached access to email messages grouped by account and folder.
///
/// Owns the page cache and the pending count markers for one open case.
/// Change batches and count fetches synchronize on `batch_barrier`:
/// enqueueing and invalidation for a batch happen under the write side,
/// and a count fetch reads the pending set under the read side.
pub struct EmailsDao {
    db: Arc<dyn CaseDatabase>,
    pages: ResultCache<PageKey, ResultPage, DaoError>,
    pending: PendingCountTracker<EmailEvent>,
    batch_barrier: RwLock<()>,
}

impl EmailsDao {
    pub fn new(db: Arc<dyn CaseDatabase>, config: &CacheConfig) -> Self {
        Self {
            db,
            pages: ResultCache::new(config.max_entries, config.time_to_idle),
            pending: PendingCountTracker::new(),
            batch_barrier: RwLock::new(()),
        }
    }

    /// Page of email messages for a folder, or for messages without a
    /// resolvable folder when account and folder are both unset.
    pub async fn fetch_page(
        &self,
        params: EmailSearchParams,
        start_item: u64,
        max_count: Option<u64>,
    ) -> Result<Arc<ResultPage>, DaoError> {
        params.validate()?;
        if max_count == Some(0) {
            return Err(DaoError::InvalidArgument(
                "max count must be greater than 0 or unset".to_string(),
            ));
        }

        let key = SearchParams::new(params, start_item, max_count);
        let db = Arc::clone(&self.db);
        let fill_key = key.clone();
        self.pages
            .get_or_compute(key, move || load_page(db, fill_key))
            .await
    }

    /// Tree counts per account, or per folder of `account` when given.
    ///
    /// Nodes with a pending change are reported as
    /// [`TreeCount::Indeterminate`]. Items are sorted by display name,
    /// ignoring case.
    pub async fn fetch_group_counts(
        &self,
        data_source_id: Option<i64>,
        account: Option<&str>,
    ) -> Result<Vec<TreeItem>, DaoError> {
        if let Some(ds) = data_source_id.filter(|ds| *ds <= 0) {
            return Err(DaoError::InvalidArgument(format!(
                "data source id must be greater than 0 or unset, got {ds}"
            )));
        }

        let query = query::group_counts_query(self.db.dialect(), account, data_source_id);
        let rows = self
            .db
            .select(&query)
            .await
            .map_err(|err| DaoError::query_failure(query.sql(), err))?;

        let indeterminate = self.indeterminate_keys(data_source_id, account);

        let mut items = match account {
            None => account_items(&rows, data_source_id, &indeterminate),
            Some(account) => folder_items(&rows, account, data_source_id, &indeterminate),
        }
        .map_err(|err| DaoError::query_failure(query.sql(), err))?;

        items.sort_by_cached_key(|item| item.display_name.to_lowercase());
        Ok(items)
    }

    /// Apply an ingest notification and return the events it produced.
    pub async fn handle_change(&self, event: ChangeEvent) -> Result<Vec<DomainEvent>, DaoError> {
        match event {
            ChangeEvent::DataAdded(data) => self.handle_data_added(data).await,
            ChangeEvent::IngestComplete => Ok(self.handle_ingest_complete()),
        }
    }

    async fn handle_data_added(&self, data: ModuleDataEvent) -> Result<Vec<DomainEvent>, DaoError> {
        if data
            .artifact_type_id
            .is_some_and(|type_id| type_id != ARTIFACT_TYPE_EMAIL_MSG)
        {
            return Ok(Vec::new());
        }

        let mut artifacts: Vec<Artifact> = data
            .artifacts
            .into_iter()
            .filter(|reference| reference.artifact_type_id == ARTIFACT_TYPE_EMAIL_MSG)
            .map(Artifact::from)
            .collect();
        if artifacts.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = artifacts.len();
        self.db
            .load_attributes(&mut artifacts)
            .await
            .map_err(|err| {
                DaoError::query_failure(&format!("load attributes of {batch_size} artifacts"), err)
            })?;

        let groups = group_artifacts(&artifacts);
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let changed: Vec<EmailEvent> = groups
            .iter()
            .flat_map(|(account, folders)| {
                folders.iter().flat_map(move |(folder, data_sources)| {
                    data_sources
                        .iter()
                        .map(move |ds| EmailEvent::new(*ds, account.clone(), folder.clone()))
                })
            })
            .collect();

        let (newly_pending, invalidated) = {
            let _batch = self.batch_barrier.write();
            let newly_pending = self.pending.enqueue_all(changed.iter().cloned());
            let invalidated = self
                .pages
                .invalidate_where(|key| is_affected(&groups, key.params()));
            (newly_pending, invalidated)
        };

        log::debug!(
            "email change: {} groups changed, {} newly pending, {} cached pages invalidated",
            changed.len(),
            newly_pending.len(),
            invalidated
        );

        let refreshes = newly_pending
            .iter()
            .map(|event| DomainEvent::TreeRefresh(TreeEvent::pending(event)));

        Ok(changed
            .into_iter()
            .map(DomainEvent::GroupChanged)
            .chain(refreshes)
            .collect())
    }

    /// Clear every pending marker and ask for an immediate refresh of the
    /// affected nodes.
    pub fn handle_ingest_complete(&self) -> Vec<DomainEvent> {
        let mut flushed = {
            let _batch = self.batch_barrier.write();
            self.pending.flush()
        };
        flushed.sort();
        immediate_refreshes(flushed)
    }

    /// Confirm the counts of the given groups, returning refresh events for
    /// those that were pending.
    pub fn confirm_counts(&self, events: &[EmailEvent]) -> Vec<DomainEvent> {
        let mut resolved = {
            let _batch = self.batch_barrier.write();
            self.pending.resolve(events)
        };
        resolved.sort();
        immediate_refreshes(resolved)
    }

    /// Drop all cached pages and pending markers.
    pub fn invalidate_all(&self) {
        let _batch = self.batch_barrier.write();
        self.pages.invalidate_all();
        let flushed = self.pending.flush();
        log::info!(
            "email caches cleared ({} pending markers dropped)",
            flushed.len()
        );
    }

    /// Pending change events, sorted.
    pub fn pending_changes(&self) -> Vec<EmailEvent> {
        let mut pending = self.pending.get_enqueued();
        pending.sort();
        pending
    }

    /// Number of result pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.pages.len()
    }

    /// Keys of the nodes that must be shown as indeterminate: accounts when
    /// listing accounts, folders when listing the folders of `account`.
    fn indeterminate_keys(
        &self,
        data_source_id: Option<i64>,
        account: Option<&str>,
    ) -> HashSet<Option<String>> {
        let _batch = self.batch_barrier.read();
        self.pending
            .get_enqueued()
            .into_iter()
            .filter(|event| data_source_id.is_none_or(|ds| ds == event.data_source_id))
            .filter(|event| account.is_none_or(|account| event.account.as_deref() == Some(account)))
            .map(|event| match account {
                None => event.account,
                Some(_) => event.folder,
            })
            .collect()
    }
}

async fn load_page(db: Arc<dyn CaseDatabase>, key: PageKey) -> Result<ResultPage, DaoError> {
    let query = query::message_ids_query(db.dialect(), key.params(), key.start_item(), key.max_count());
    let rows = db
        .select(&query)
        .await
        .map_err(|err| DaoError::query_failure(query.sql(), err))?;

    let ids = rows
        .iter()
        .map(|row| row.get_long("artifact_id"))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| DaoError::query_failure(query.sql(), err))?;

    let mut artifacts = Vec::new();
    if !ids.is_empty() {
        artifacts = db
            .load_artifacts(&ids)
            .await
            .map_err(|err| DaoError::query_failure(&format!("load artifacts {ids:?}"), err))?;
        // one round trip for the whole page
        db.load_attributes(&mut artifacts)
            .await
            .map_err(|err| DaoError::query_failure(&format!("load attributes of {ids:?}"), err))?;
    }

    let table = build_table(&artifacts);
    Ok(ResultPage {
        type_id: EmailSearchParams::TYPE_ID.to_string(),
        column_keys: table.column_keys,
        total_results: table.rows.len() as u64,
        rows: table.rows,
        start_item: key.start_item(),
    })
}

fn group_artifacts(artifacts: &[Artifact]) -> GroupMap {
    let mut groups = GroupMap::new();
    for artifact in artifacts {
        let Some(GroupKey { account, folder }) = artifact
            .attribute_text(ATTRIBUTE_TYPE_PATH)
            .and_then(decode_path)
        else {
            log::warn!(
                "skipping email artifact {}: path does not resolve to an account and folder",
                artifact.id()
            );
            continue;
        };

        groups
            .entry(account)
            .or_default()
            .entry(folder)
            .or_default()
            .insert(artifact.data_source_id());
    }
    groups
}

/// Whether a cached page for `params` may contain artifacts from `groups`.
fn is_affected(groups: &GroupMap, params: &EmailSearchParams) -> bool {
    let Some(folders) = groups.get(&params.account().map(str::to_string)) else {
        return false;
    };

    folders.iter().any(|(folder, data_sources)| {
        let folder_matches = match (folder.as_deref(), params.folder()) {
            (Some(changed), Some(cached)) => changed == cached,
            _ => true,
        };
        folder_matches
            && params
                .data_source_id()
                .is_none_or(|ds| data_sources.contains(&ds))
    })
}

fn immediate_refreshes(events: Vec<EmailEvent>) -> Vec<DomainEvent> {
    events
        .into_iter()
        .map(|event| DomainEvent::TreeRefresh(TreeEvent::refetch(&event)))
        .collect()
}

fn tree_count(count: u64, key: &Option<String>, indeterminate: &HashSet<Option<String>>) -> TreeCount {
    if indeterminate.contains(key) {
        TreeCount::Indeterminate
    } else {
        TreeCount::Determinate(count)
    }
}

fn row_count(row: &Row) -> Result<u64, crate::store::StoreError> {
    Ok(u64::try_from(row.get_long("count")?).unwrap_or_default())
}

/// Empty path segments come back as `''` and stay selectable groups.
fn segment(row: &Row, column: &str) -> Result<Option<String>, crate::store::StoreError> {
    Ok(row.get_string(column)?.map(str::to_string))
}

fn account_items(
    rows: &[Row],
    data_source_id: Option<i64>,
    indeterminate: &HashSet<Option<String>>,
) -> Result<Vec<TreeItem>, crate::store::StoreError> {
    let mut totals: BTreeMap<Option<String>, u64> = BTreeMap::new();
    for row in rows {
        *totals.entry(segment(row, "account")?).or_default() += row_count(row)?;
    }

    Ok(totals
        .into_iter()
        .map(|(account, count)| TreeItem {
            type_id: EmailSearchParams::TYPE_ID.to_string(),
            id: codec::encode_path(account.as_deref(), None),
            display_name: codec::account_display_name(account.as_deref()),
            count: tree_count(count, &account, indeterminate),
            search_params: EmailSearchParams::new(data_source_id, account, None),
        })
        .collect())
}

fn folder_items(
    rows: &[Row],
    account: &str,
    data_source_id: Option<i64>,
    indeterminate: &HashSet<Option<String>>,
) -> Result<Vec<TreeItem>, crate::store::StoreError> {
    rows.iter()
        .map(|row| {
            let folder = segment(row, "folder")?;
            let count = row_count(row)?;
            Ok(TreeItem {
                type_id: EmailSearchParams::TYPE_ID.to_string(),
                id: codec::encode_path(Some(account), folder.as_deref()),
                display_name: codec::folder_display_name(folder.as_deref()),
                count: tree_count(count, &folder, indeterminate),
                search_params: EmailSearchParams::new(
                    data_source_id,
                    Some(account.to_string()),
                    folder,
                ),
            })
        })
        .collect()
}
