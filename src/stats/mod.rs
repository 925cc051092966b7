//! Cardinality statistics.
//!
//! Statistics are advisory: they steer optimizations such as segment
//! prefetching and never decide correctness. A count that cannot be answered
//! yields [`Cardinality::Unknown`] instead of an error, and callers must not
//! confuse that with a known count of zero.

mod caching;
mod sql;

pub use caching::CachingStatisticsProvider;
pub use sql::SqlStatisticsProvider;

use serde::{Deserialize, Serialize};

use crate::sql::{SqlDialect, TableName};
use crate::statement::StatementExecutor;

/// Result of a cardinality estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    Known(u64),
    Unknown,
}

impl Cardinality {
    /// The count, if known.
    pub fn known(self) -> Option<u64> {
        match self {
            Cardinality::Known(n) => Some(n),
            Cardinality::Unknown => None,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Cardinality::Unknown)
    }

    /// Legacy encoding: the count, or `-1` when unknown.
    pub fn as_sentinel(self) -> i64 {
        match self {
            Cardinality::Known(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Cardinality::Unknown => -1,
        }
    }

    /// Inverse of [`as_sentinel`](Self::as_sentinel): negative means unknown.
    pub fn from_sentinel(value: i64) -> Self {
        u64::try_from(value).map_or(Cardinality::Unknown, Cardinality::Known)
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::Known(n) => write!(f, "{n}"),
            Cardinality::Unknown => write!(f, "unknown"),
        }
    }
}

/// Source of cardinality estimates.
///
/// Implementations are read-only and may be shared across concurrently
/// executing queries.
pub trait StatisticsProvider: Send + Sync {
    /// Number of rows in a table.
    fn table_cardinality(
        &self,
        dialect: &dyn SqlDialect,
        executor: &dyn StatementExecutor,
        table: &TableName,
    ) -> Cardinality;

    /// Number of rows a SELECT statement returns.
    fn query_cardinality(
        &self,
        dialect: &dyn SqlDialect,
        executor: &dyn StatementExecutor,
        sql: &str,
    ) -> Cardinality;

    /// Number of distinct values in a column.
    fn column_cardinality(
        &self,
        dialect: &dyn SqlDialect,
        executor: &dyn StatementExecutor,
        table: &TableName,
        column: &str,
    ) -> Cardinality;
}
