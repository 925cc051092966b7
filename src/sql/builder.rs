//! Dialect-aware SQL builder.
//!
//! Composes the statements the engine issues for statistics: row counts,
//! distinct counts, and derived-table wrapping. Every method is pure string
//! generation; execution happens elsewhere.

use super::dialect::SqlDialect;
use super::expr::{col, count_distinct, count_star};
use super::query::{Query, TableName, TableRef};
use super::token::Token;

/// Alias given to derived tables when the dialect insists on one.
pub const DERIVED_TABLE_ALIAS: &str = "init";

/// Builds SQL for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlBuilder<'d> {
    dialect: &'d dyn SqlDialect,
}

impl<'d> SqlBuilder<'d> {
    pub fn new(dialect: &'d dyn SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &'d dyn SqlDialect {
        self.dialect
    }

    /// Quote a single column (or any bare) identifier.
    pub fn quote_identifier(&self, column: &str) -> String {
        self.dialect.quote_identifier(column)
    }

    /// Quote a table name, omitting absent catalog and schema segments.
    pub fn quote_qualified(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> String {
        Token::QualifiedIdent {
            catalog: catalog.map(String::from),
            schema: schema.map(String::from),
            name: table.into(),
        }
        .serialize(self.dialect)
    }

    /// Wrap a FROM source as a derived table.
    ///
    /// Returns `None` when the dialect has no sub-selects in FROM. The alias
    /// is added only when the dialect requires one.
    pub fn derived_table(&self, source: TableRef) -> Option<TableRef> {
        if !self.dialect.allows_from_query() {
            return None;
        }
        Some(if self.dialect.requires_alias_for_from_query() {
            source.with_alias(DERIVED_TABLE_ALIAS)
        } else {
            source
        })
    }

    /// `SELECT COUNT(*) FROM <table>`
    pub fn table_count_sql(&self, table: &TableName) -> String {
        Query::new()
            .select(vec![count_star()])
            .from(table.clone())
            .to_sql(self.dialect)
    }

    /// `SELECT COUNT(*) FROM (<sql>)`, or `None` without derived tables.
    pub fn query_count_sql(&self, sql: &str) -> Option<String> {
        let derived = self.derived_table(TableRef::raw(sql))?;
        Some(
            Query::new()
                .select(vec![count_star()])
                .from(derived)
                .to_sql(self.dialect),
        )
    }

    /// Distinct-value count of one column.
    ///
    /// Emits `COUNT(DISTINCT col)` when the dialect allows it, otherwise a
    /// `SELECT DISTINCT` derived table. `None` when neither form is available.
    pub fn column_distinct_count_sql(&self, table: &TableName, column: &str) -> Option<String> {
        if self.dialect.allows_count_distinct() {
            return Some(
                Query::new()
                    .select(vec![count_distinct(col(column))])
                    .from(table.clone())
                    .to_sql(self.dialect),
            );
        }

        let inner = Query::new()
            .distinct()
            .select(vec![col(column)])
            .from(table.clone());
        let derived = self.derived_table(TableRef::subquery(inner))?;
        Some(
            Query::new()
                .select(vec![count_star()])
                .from(derived)
                .to_sql(self.dialect),
        )
    }
}
