//! Statistics computed by counting queries.

use tracing::{debug, warn};

use super::{Cardinality, StatisticsProvider};
use crate::sql::{SqlBuilder, SqlDialect, TableName};
use crate::statement::{Locus, SqlValue, StatementExecutor};

/// Issues `COUNT` statements through the statement executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlStatisticsProvider;

impl SqlStatisticsProvider {
    pub fn new() -> Self {
        Self
    }

    fn count_rows(&self, executor: &dyn StatementExecutor, sql: &str, locus: Locus) -> Cardinality {
        debug!(%locus, sql, "probing cardinality");
        match executor.execute(sql, &locus) {
            Ok(rows) => match rows.first_value().and_then(SqlValue::as_i64) {
                Some(n) if n >= 0 => Cardinality::Known(n as u64),
                _ => {
                    debug!(%locus, "cardinality query returned no usable row");
                    Cardinality::Unknown
                }
            },
            Err(err) => {
                warn!(%locus, error = %err, "cardinality query failed");
                Cardinality::Unknown
            }
        }
    }
}

impl StatisticsProvider for SqlStatisticsProvider {
    fn table_cardinality(
        &self,
        dialect: &dyn SqlDialect,
        executor: &dyn StatementExecutor,
        table: &TableName,
    ) -> Cardinality {
        let sql = SqlBuilder::new(dialect).table_count_sql(table);
        self.count_rows(
            executor,
            &sql,
            Locus::new("statistics", format!("table cardinality of {table}")),
        )
    }

    fn query_cardinality(
        &self,
        dialect: &dyn SqlDialect,
        executor: &dyn StatementExecutor,
        sql: &str,
    ) -> Cardinality {
        match SqlBuilder::new(dialect).query_count_sql(sql) {
            Some(count_sql) => self.count_rows(
                executor,
                &count_sql,
                Locus::new("statistics", "query cardinality"),
            ),
            None => Cardinality::Unknown,
        }
    }

    fn column_cardinality(
        &self,
        dialect: &dyn SqlDialect,
        executor: &dyn StatementExecutor,
        table: &TableName,
        column: &str,
    ) -> Cardinality {
        match SqlBuilder::new(dialect).column_distinct_count_sql(table, column) {
            Some(sql) => self.count_rows(
                executor,
                &sql,
                Locus::new("statistics", format!("column cardinality of {table}.{column}")),
            ),
            None => {
                debug!(
                    dialect = dialect.name(),
                    "no count-distinct form available, column cardinality unknown"
                );
                Cardinality::Unknown
            }
        }
    }
}
