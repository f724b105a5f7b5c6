//! SQL for email pages and account/folder counts.
//!
//! Account and folder are not columns: they are the 3rd and 4th segments of
//! the path attribute. Each dialect splits the path with the text functions
//! it has, behind [`DialectStrategy`], and the shared query text compares the
//! extracted segments with `=`. A `LIKE` on the raw path only narrows the
//! scan; SQLite's `LIKE` ignores case, so it never decides membership.

use super::codec::{ESCAPE_CHAR, MIN_PATH_SEGMENTS, PATH_DELIMITER, like_escape};
use super::params::EmailSearchParams;
use crate::store::{ARTIFACT_TYPE_EMAIL_MSG, ATTRIBUTE_TYPE_PATH, Dialect, Query, QueryParam};

/// Dialect specific fragments of the email queries.
pub trait DialectStrategy: Sync {
    /// Placeholder for the `index`-th bound parameter (1-based).
    fn placeholder(&self, index: usize) -> String;

    /// Select `artifact_id`, `path`, `account` and `folder` from a subquery
    /// `source` exposing `artifact_id` and `path`.
    fn path_segments(&self, source: &str) -> String;

    /// `LIMIT`/`OFFSET` tail; `limit` is `None` when no limit is bound.
    fn limit_offset(&self, limit: Option<&str>, offset: &str) -> String;
}

pub struct PostgresStrategy;

pub struct SqliteStrategy;

impl DialectStrategy for PostgresStrategy {
    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn path_segments(&self, source: &str) -> String {
        let d = PATH_DELIMITER;
        format!(
            "SELECT p.artifact_id, p.path, \
             SPLIT_PART(p.path, '{d}', 3) AS account, \
             SPLIT_PART(p.path, '{d}', 4) AS folder \
             FROM ({source}) p"
        )
    }

    fn limit_offset(&self, limit: Option<&str>, offset: &str) -> String {
        match limit {
            Some(limit) => format!("LIMIT {limit} OFFSET {offset}"),
            None => format!("OFFSET {offset}"),
        }
    }
}

impl SqliteStrategy {
    /// Text of `value` before the first delimiter, or all of it.
    fn before_delimiter(value: &str) -> String {
        let d = PATH_DELIMITER;
        format!(
            "CASE WHEN INSTR({value}, '{d}') > 0 \
             THEN SUBSTR({value}, 1, INSTR({value}, '{d}') - 1) \
             ELSE {value} END"
        )
    }

    /// Text of `value` after the first delimiter, or `''`.
    fn after_delimiter(value: &str) -> String {
        let d = PATH_DELIMITER;
        format!(
            "CASE WHEN INSTR({value}, '{d}') > 0 \
             THEN SUBSTR({value}, INSTR({value}, '{d}') + 1) \
             ELSE '' END"
        )
    }
}

impl DialectStrategy for SqliteStrategy {
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn path_segments(&self, source: &str) -> String {
        // peel one leading segment per level down to account and folder
        let first = format!(
            "SELECT p.artifact_id, p.path, {} AS rest FROM ({source}) p",
            Self::after_delimiter("p.path")
        );
        let second = format!(
            "SELECT s1.artifact_id, s1.path, {} AS rest FROM ({first}) s1",
            Self::after_delimiter("s1.rest")
        );
        let third = format!(
            "SELECT s2.artifact_id, s2.path, {} AS account, {} AS rest FROM ({second}) s2",
            Self::before_delimiter("s2.rest"),
            Self::after_delimiter("s2.rest")
        );
        format!(
            "SELECT s3.artifact_id, s3.path, s3.account, {} AS folder FROM ({third}) s3",
            Self::before_delimiter("s3.rest")
        )
    }

    fn limit_offset(&self, limit: Option<&str>, offset: &str) -> String {
        // SQLite only accepts OFFSET after a LIMIT
        format!("LIMIT {} OFFSET {offset}", limit.unwrap_or("-1"))
    }
}

pub fn strategy(dialect: Dialect) -> &'static dyn DialectStrategy {
    match dialect {
        Dialect::Postgres => &PostgresStrategy,
        Dialect::Sqlite => &SqliteStrategy,
    }
}

/// Collects parameters and hands out matching placeholders.
struct Binder<'a> {
    strategy: &'a dyn DialectStrategy,
    params: Vec<QueryParam>,
}

impl<'a> Binder<'a> {
    fn new(strategy: &'a dyn DialectStrategy) -> Self {
        Self {
            strategy,
            params: Vec::new(),
        }
    }

    fn push(&mut self, param: QueryParam) -> String {
        self.params.push(param);
        self.strategy.placeholder(self.params.len())
    }

    fn finish(self, sql: String) -> Query {
        self.params
            .into_iter()
            .fold(Query::new(sql), |query, param| query.bind(param))
    }
}

/// Condition true when `path` decodes to an account and folder: it has at
/// least `MIN_PATH_SEGMENTS - 1` delimiters once trailing ones are cut.
fn decodes_to_group(path: &str) -> String {
    let d = PATH_DELIMITER;
    let trimmed = format!("RTRIM({path}, '{d}')");
    format!(
        "LENGTH({trimmed}) - LENGTH(REPLACE({trimmed}, '{d}', '')) >= {}",
        MIN_PATH_SEGMENTS - 1
    )
}

/// `LIKE` pattern for paths containing `/<segments joined by />`.
fn contains_pattern(segments: &[&str], trailing_delimiter: bool) -> String {
    let d = PATH_DELIMITER;
    let joined = segments
        .iter()
        .map(|segment| like_escape(Some(*segment)))
        .collect::<Vec<_>>()
        .join(&d.to_string());
    let tail = if trailing_delimiter {
        d.to_string()
    } else {
        String::new()
    };
    format!("%{d}{joined}{tail}%")
}

/// One row per email artifact with its path, optionally narrowed by a
/// `LIKE` pattern and a data source.
fn email_paths(binder: &mut Binder<'_>, narrow: Option<String>, data_source_id: Option<i64>) -> String {
    let mut filters = String::new();
    if let Some(pattern) = narrow {
        let placeholder = binder.push(QueryParam::Text(pattern));
        filters.push_str(&format!(
            " AND attr.value_text LIKE {placeholder} ESCAPE '{ESCAPE_CHAR}'"
        ));
    }
    if let Some(ds) = data_source_id {
        let placeholder = binder.push(QueryParam::Long(ds));
        filters.push_str(&format!(" AND art.data_source_obj_id = {placeholder}"));
    }

    format!(
        "SELECT attr.artifact_id AS artifact_id, MIN(attr.value_text) AS path \
         FROM blackboard_attributes attr \
         LEFT JOIN blackboard_artifacts art ON attr.artifact_id = art.artifact_id \
         WHERE attr.attribute_type_id = {ATTRIBUTE_TYPE_PATH} \
         AND art.artifact_type_id = {ARTIFACT_TYPE_EMAIL_MSG}{filters} \
         GROUP BY attr.artifact_id"
    )
}

/// Counts of email messages grouped by account and folder.
///
/// With an `account` filter only folders of that account are returned and
/// the result has no `account` column. Paths that do not decode are not
/// counted.
pub fn group_counts_query(
    dialect: Dialect,
    account: Option<&str>,
    data_source_id: Option<i64>,
) -> Query {
    let strategy = strategy(dialect);
    let mut binder = Binder::new(strategy);

    let narrow = account.map(|account| contains_pattern(&[account], true));
    let paths = email_paths(&mut binder, narrow, data_source_id);
    let segments = strategy.path_segments(&paths);

    let mut conditions = vec![decodes_to_group("account_folder.path")];
    if let Some(account) = account {
        let placeholder = binder.push(QueryParam::Text(account.to_string()));
        conditions.push(format!("account_folder.account = {placeholder}"));
    }

    let with_account = account.is_none();
    let group_columns = if with_account {
        "account_folder.account, account_folder.folder"
    } else {
        "account_folder.folder"
    };

    let sql = format!(
        "SELECT COUNT(*) AS count, {group_columns} \
         FROM ({segments}) account_folder \
         WHERE {} \
         GROUP BY {group_columns}",
        conditions.join(" AND ")
    );

    let query = binder.finish(sql).long_column("count");
    let query = if with_account {
        query.text_column("account")
    } else {
        query
    };
    query.text_column("folder")
}

/// Ids of the email messages matching `params`, ordered by artifact id.
///
/// Without account and folder only messages whose path does not decode to
/// a group are returned.
pub fn message_ids_query(
    dialect: Dialect,
    params: &EmailSearchParams,
    start_item: u64,
    max_count: Option<u64>,
) -> Query {
    let strategy = strategy(dialect);
    let mut binder = Binder::new(strategy);

    let group = params.account().zip(params.folder());
    let narrow = group.map(|(account, folder)| contains_pattern(&[account, folder], false));
    let paths = email_paths(&mut binder, narrow, params.data_source_id());
    let segments = strategy.path_segments(&paths);

    let conditions = match group {
        Some((account, folder)) => {
            let account = binder.push(QueryParam::Text(account.to_string()));
            let folder = binder.push(QueryParam::Text(folder.to_string()));
            format!(
                "{} AND account_folder.account = {account} AND account_folder.folder = {folder}",
                decodes_to_group("account_folder.path")
            )
        }
        None => format!("NOT ({})", decodes_to_group("account_folder.path")),
    };

    let limit = max_count.map(|max| binder.push(QueryParam::Long(to_sql_long(max))));
    let offset = binder.push(QueryParam::Long(to_sql_long(start_item)));
    let window = strategy.limit_offset(limit.as_deref(), &offset);

    let sql = format!(
        "SELECT CAST(account_folder.artifact_id AS BIGINT) AS artifact_id \
         FROM ({segments}) account_folder \
         WHERE {conditions} \
         ORDER BY account_folder.artifact_id \
         {window}"
    );

    binder.finish(sql).long_column("artifact_id")
}

fn to_sql_long(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
