//! Parse generated SQL with sqlparser to check it is well-formed for the
//! dialect it was generated for.

use sqlparser::dialect::{
    AnsiDialect, DuckDbDialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
    SQLiteDialect, SnowflakeDialect,
};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// The sqlparser dialect closest to `dialect`.
///
/// Dialects sqlparser has no parser for fall back to a relative: Redshift
/// parses as PostgreSQL, Access as T-SQL (brackets and `TOP`), and BigQuery,
/// Databricks and Oracle as the generic dialect.
pub fn parser_dialect(dialect: Dialect) -> Box<dyn sqlparser::dialect::Dialect> {
    match dialect {
        Dialect::Ansi => Box::new(AnsiDialect {}),
        Dialect::Postgres | Dialect::Redshift => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql | Dialect::Access => Box::new(MsSqlDialect {}),
        Dialect::Snowflake => Box::new(SnowflakeDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::BigQuery | Dialect::Databricks | Dialect::Oracle => Box::new(GenericDialect {}),
    }
}

/// `Ok` when `sql` is exactly one statement that parses in `dialect`.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let statements = Parser::parse_sql(&*parser_dialect(dialect), sql)
        .map_err(|e| format!("{dialect}: {e}\nSQL: {sql}"))?;
    match statements.len() {
        1 => Ok(()),
        n => Err(format!("{dialect}: expected one statement, found {n}\nSQL: {sql}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_query_shape_parses() {
        let sql = "SELECT SUM(\"amount\") AS \"m\", COUNT(*) AS \"n\" FROM \"sales_fact\" \
                   WHERE \"store_state\" = 'CA'";
        validate_sql(sql, Dialect::Postgres).unwrap();
        validate_sql(sql, Dialect::Sqlite).unwrap();
    }

    #[test]
    fn test_rejects_broken_and_multiple_statements() {
        assert!(validate_sql("SELEC COUNT(*) FORM sales_fact", Dialect::Ansi).is_err());
        assert!(validate_sql("SELECT 1; SELECT 2", Dialect::Postgres).is_err());
    }
}
