//! Boundary to the case database holding forensic artifacts.
//!
//! The DAO layer never talks SQL drivers directly. It builds a [`Query`],
//! hands it to a [`CaseDatabase`] and reads named columns back from
//! [`Row`]s. Artifacts and their attributes are loaded through the same
//! trait so that attribute loading can be batched per request.

mod artifact;
mod row;

pub use artifact::{
    ARTIFACT_TYPE_EMAIL_MSG, ATTRIBUTE_TYPE_PATH, Artifact, ArtifactRef, Attribute,
};
pub use row::{CellValue, ColumnKind, Query, QueryParam, Row};

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Failures surfaced by a [`CaseDatabase`] implementation.
///
/// `Clone` so a single failed computation can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("case database unavailable: {0}")]
    Unavailable(String),
    #[error("column '{0}' missing from result row")]
    MissingColumn(String),
    #[error("column '{column}' does not hold a {expected} value")]
    ColumnType {
        column: String,
        expected: &'static str,
    },
}

/// SQL capability profile of the backing case database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

/// Raised when a dialect tag or database URL names an unsupported engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown database dialect '{0}'")]
pub struct UnknownDialect(pub String);

impl Dialect {
    /// Pick the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, UnknownDialect> {
        let scheme = url.split(':').next().unwrap_or_default();
        scheme.parse()
    }
}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(UnknownDialect(other.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => f.write_str("postgres"),
            Dialect::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Read access to a case database.
///
/// Every method is a single atomic call that either returns all rows or
/// fails; no transaction spans more than one call.
#[async_trait]
pub trait CaseDatabase: Send + Sync {
    /// Dialect used to render queries for this database.
    fn dialect(&self) -> Dialect;

    /// Execute a select and decode the columns declared on the query.
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Load artifact headers for the given ids, preserving the order of `ids`.
    /// Ids that do not exist are left out.
    async fn load_artifacts(&self, ids: &[i64]) -> Result<Vec<Artifact>, StoreError>;

    /// Populate the attributes of every artifact in one round trip.
    async fn load_attributes(&self, artifacts: &mut [Artifact]) -> Result<(), StoreError>;
}
