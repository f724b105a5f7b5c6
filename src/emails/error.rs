use crate::store::{StoreError, UnknownDialect};
use thiserror::Error;

/// Errors surfaced by [`EmailsDao`](super::EmailsDao).
///
/// `Clone` so that a failed shared fill reaches every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DaoError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("query failed: {source}\n{query}")]
    QueryFailure {
        query: String,
        #[source]
        source: StoreError,
    },

    #[error("configuration fault: {0}")]
    ConfigurationFault(#[from] UnknownDialect),
}

impl DaoError {
    pub(crate) fn query_failure(query: &str, source: StoreError) -> Self {
        DaoError::QueryFailure {
            query: query.to_string(),
            source,
        }
    }
}
