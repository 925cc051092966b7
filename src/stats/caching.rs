//! Memoised statistics shared across queries.

use dashmap::DashMap;

use super::{Cardinality, StatisticsProvider};
use crate::sql::{SqlDialect, TableName};
use crate::statement::StatementExecutor;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Lookup {
    Table(TableName),
    Query(String),
    Column(TableName, String),
}

/// Remembers known cardinalities of an inner provider.
///
/// Entries are keyed by dialect name and lookup. Unknown results are not
/// stored, so a transient failure is retried on the next request. Use one
/// instance per data source.
#[derive(Debug)]
pub struct CachingStatisticsProvider<P> {
    inner: P,
    cache: DashMap<(String, Lookup), u64>,
}

impl<P: StatisticsProvider> CachingStatisticsProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Number of stored cardinalities.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Forget every stored cardinality.
    pub fn clear(&self) {
        self.cache.clear();
    }

    fn cached(
        &self,
        dialect: &dyn SqlDialect,
        lookup: Lookup,
        compute: impl FnOnce() -> Cardinality,
    ) -> Cardinality {
        let key = (dialect.name().to_string(), lookup);
        if let Some(hit) = self.cache.get(&key) {
            return Cardinality::Known(*hit);
        }
        let result = compute();
        if let Cardinality::Known(n) = result {
            self.cache.insert(key, n);
        }
        result
    }
}

impl<P: StatisticsProvider> StatisticsProvider for CachingStatisticsProvider<P> {
    fn table_cardinality(
        &self,
        dialect: &dyn SqlDialect,
        executor: &dyn StatementExecutor,
        table: &TableName,
    ) -> Cardinality {
        self.cached(dialect, Lookup::Table(table.clone()), || {
            self.inner.table_cardinality(dialect, executor, table)
        })
    }

    fn query_cardinality(
        &self,
        dialect: &dyn SqlDialect,
        executor: &dyn StatementExecutor,
        sql: &str,
    ) -> Cardinality {
        self.cached(dialect, Lookup::Query(sql.to_string()), || {
            self.inner.query_cardinality(dialect, executor, sql)
        })
    }

    fn column_cardinality(
        &self,
        dialect: &dyn SqlDialect,
        executor: &dyn StatementExecutor,
        table: &TableName,
        column: &str,
    ) -> Cardinality {
        self.cached(
            dialect,
            Lookup::Column(table.clone(), column.to_string()),
            || self.inner.column_cardinality(dialect, executor, table, column),
        )
    }
}
