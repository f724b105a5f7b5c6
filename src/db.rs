//! sqlx implementation of [`CaseDatabase`] for PostgreSQL and SQLite case
//! databases.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row as _};
use thiserror::Error;

use crate::store::{
    Artifact, ArtifactRef, Attribute, CaseDatabase, CellValue, ColumnKind, Dialect, Query,
    QueryParam, Row, StoreError, UnknownDialect,
};

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Dialect(#[from] UnknownDialect),
    #[error("failed to connect to case database: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Case database reached through a `sqlx` any-driver pool.
#[derive(Debug, Clone)]
pub struct SqlxCaseDatabase {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlxCaseDatabase {
    /// Open a pool for `url`. The URL scheme selects the dialect.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, ConnectError> {
        let dialect = Dialect::from_url(url)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await?;

        log::info!("connected to {dialect} case database");
        Ok(Self { pool, dialect })
    }

    pub fn from_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

/// Comma separated id list for an `IN (...)` clause.
fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn decode_cell(row: &AnyRow, name: &str, kind: ColumnKind) -> Result<CellValue, StoreError> {
    let value = match kind {
        ColumnKind::Long => row
            .try_get::<Option<i64>, _>(name)?
            .map_or(CellValue::Null, CellValue::Long),
        ColumnKind::Text => row
            .try_get::<Option<String>, _>(name)?
            .map_or(CellValue::Null, CellValue::Text),
    };
    Ok(value)
}

fn type_id(row: &AnyRow, column: &str) -> Result<i32, StoreError> {
    let value: i64 = row.try_get(column)?;
    i32::try_from(value).map_err(|_| StoreError::ColumnType {
        column: column.to_string(),
        expected: "32-bit integer",
    })
}

#[async_trait]
impl CaseDatabase for SqlxCaseDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let mut statement = sqlx::query(query.sql());
        for param in query.params() {
            statement = match param {
                QueryParam::Text(value) => statement.bind(value.clone()),
                QueryParam::Long(value) => statement.bind(*value),
            };
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                query
                    .columns()
                    .iter()
                    .map(|(name, kind)| Ok((name.to_string(), decode_cell(row, name, *kind)?)))
                    .collect::<Result<Vec<_>, StoreError>>()
                    .map(Row::new)
            })
            .collect()
    }

    async fn load_artifacts(&self, ids: &[i64]) -> Result<Vec<Artifact>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT CAST(artifact_id AS BIGINT) AS artifact_id, \
             CAST(artifact_type_id AS BIGINT) AS artifact_type_id, \
             CAST(data_source_obj_id AS BIGINT) AS data_source_obj_id \
             FROM blackboard_artifacts WHERE artifact_id IN ({})",
            id_list(ids)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in &rows {
            let reference = ArtifactRef {
                artifact_id: row.try_get("artifact_id")?,
                artifact_type_id: type_id(row, "artifact_type_id")?,
                data_source_id: row.try_get("data_source_obj_id")?,
            };
            by_id.insert(reference.artifact_id, reference);
        }

        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id).copied().map(Artifact::from))
            .collect())
    }

    async fn load_attributes(&self, artifacts: &mut [Artifact]) -> Result<(), StoreError> {
        if artifacts.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = artifacts.iter().map(Artifact::id).collect();
        let sql = format!(
            "SELECT CAST(attr.artifact_id AS BIGINT) AS artifact_id, \
             CAST(attr.attribute_type_id AS BIGINT) AS attribute_type_id, \
             types.type_name AS type_name, attr.value_text AS value_text \
             FROM blackboard_attributes attr \
             LEFT JOIN blackboard_attribute_types types \
             ON attr.attribute_type_id = types.attribute_type_id \
             WHERE attr.artifact_id IN ({}) \
             ORDER BY attr.artifact_id, attr.attribute_type_id",
            id_list(&ids)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut by_artifact: HashMap<i64, Vec<Attribute>> = HashMap::new();
        for row in &rows {
            let artifact_id: i64 = row.try_get("artifact_id")?;
            let type_id = type_id(row, "attribute_type_id")?;
            let type_name = row
                .try_get::<Option<String>, _>("type_name")?
                .unwrap_or_else(|| format!("ATTR_{type_id}"));
            by_artifact.entry(artifact_id).or_default().push(Attribute {
                type_id,
                type_name,
                value_text: row.try_get("value_text")?,
            });
        }

        for artifact in artifacts.iter_mut() {
            let attributes = by_artifact.remove(&artifact.id()).unwrap_or_default();
            artifact.set_attributes(attributes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn id_lists_are_comma_separated() {
        assert_eq!(id_list(&[3, 1, 2]), "3, 1, 2");
        assert_eq!(id_list(&[]), "");
    }
}
