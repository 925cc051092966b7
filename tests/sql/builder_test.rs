//! Statistics SQL across dialects: every statement must parse in its
//! dialect, and the SQLite forms must run against a real database.

#[path = "../common/mod.rs"]
mod common;

use common::SqliteExecutor;
use rolap::sql::{Dialect, DialectDescriptor, IdentifierQuoting, SqlBuilder, SqlDialect, TableName};
use rolap::statement::{Locus, StatementExecutor};
use sqlparser::dialect::{
    AnsiDialect, DuckDbDialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
    SQLiteDialect, SnowflakeDialect,
};
use sqlparser::parser::Parser;

fn assert_parses(sql: &str, dialect: Dialect) {
    let parser: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Ansi => Box::new(AnsiDialect {}),
        Dialect::Postgres | Dialect::Redshift => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql | Dialect::Access => Box::new(MsSqlDialect {}),
        Dialect::Snowflake => Box::new(SnowflakeDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::BigQuery | Dialect::Databricks | Dialect::Oracle => Box::new(GenericDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser, sql) {
        panic!("{dialect}: {e}\nSQL: {sql}");
    }
}

fn scalar(executor: &SqliteExecutor, sql: &str) -> i64 {
    let rows = executor
        .execute(sql, &Locus::new("test", "scalar"))
        .unwrap();
    rows.first_value().and_then(|v| v.as_i64()).unwrap()
}

// =============================================================================
// Every dialect
// =============================================================================

#[test]
fn test_table_count_parses_in_every_dialect() {
    let table = TableName::new("sales_fact")
        .with_schema("sales")
        .with_catalog("dw");
    for dialect in Dialect::ALL {
        let sql = SqlBuilder::new(&dialect).table_count_sql(&table);
        assert!(sql.starts_with("SELECT COUNT(*) FROM "), "{sql}");
        assert_parses(&sql, dialect);
    }
}

#[test]
fn test_distinct_count_parses_in_every_dialect() {
    let table = TableName::new("sales_fact");
    for dialect in Dialect::ALL {
        let sql = SqlBuilder::new(&dialect)
            .column_distinct_count_sql(&table, "customer_id")
            .unwrap();
        assert_parses(&sql, dialect);
        assert_eq!(
            sql.contains("COUNT(DISTINCT"),
            dialect.allows_count_distinct(),
            "{sql}"
        );
    }
}

#[test]
fn test_query_count_parses_in_every_dialect() {
    for dialect in Dialect::ALL {
        let b = SqlBuilder::new(&dialect);
        let inner = b.table_count_sql(&TableName::new("sales_fact"));
        let sql = b.query_count_sql(&inner).unwrap();
        assert_parses(&sql, dialect);
        assert_eq!(
            sql.ends_with(')'),
            !dialect.requires_alias_for_from_query(),
            "{sql}"
        );
    }
}

// =============================================================================
// Alias rules
// =============================================================================

#[test]
fn test_oracle_derived_table_has_no_alias() {
    let sql = SqlBuilder::new(&Dialect::Oracle)
        .query_count_sql("SELECT 1 FROM dual")
        .unwrap();
    insta::assert_snapshot!(sql, @"SELECT COUNT(*) FROM (SELECT 1 FROM dual)");
}

#[test]
fn test_access_distinct_count_fallback() {
    let sql = SqlBuilder::new(&Dialect::Access)
        .column_distinct_count_sql(&TableName::new("sales_fact"), "store_state")
        .unwrap();
    insta::assert_snapshot!(
        sql,
        @"SELECT COUNT(*) FROM (SELECT DISTINCT [store_state] FROM [sales_fact]) AS [init]"
    );
}

#[test]
fn test_derived_table_alias_follows_descriptor() {
    let quoted = DialectDescriptor::new("custom")
        .with_quoting(IdentifierQuoting::Backtick)
        .with_alias_for_from_query(true);
    assert_eq!(
        SqlBuilder::new(&quoted).query_count_sql("SELECT 1").unwrap(),
        "SELECT COUNT(*) FROM (SELECT 1) AS `init`"
    );

    let bare_alias = quoted.clone().with_as(false);
    assert_eq!(
        SqlBuilder::new(&bare_alias).query_count_sql("SELECT 1").unwrap(),
        "SELECT COUNT(*) FROM (SELECT 1) `init`"
    );
}

// =============================================================================
// Quoting
// =============================================================================

#[test]
fn test_quote_qualified_per_quoting_style() {
    assert_eq!(
        SqlBuilder::new(&Dialect::MySql).quote_qualified(Some("dw"), Some("sales"), "fact"),
        "`dw`.`sales`.`fact`"
    );
    assert_eq!(
        SqlBuilder::new(&Dialect::TSql).quote_qualified(None, Some("dbo"), "fact"),
        "[dbo].[fact]"
    );
    assert_eq!(
        SqlBuilder::new(&Dialect::Sqlite).quote_qualified(None, None, "fact"),
        "\"fact\""
    );
}

#[test]
fn test_quote_identifier_escapes_delimiters() {
    assert_eq!(
        SqlBuilder::new(&Dialect::Postgres).quote_identifier("odd\"name"),
        "\"odd\"\"name\""
    );
    assert_eq!(
        SqlBuilder::new(&Dialect::BigQuery).quote_identifier("odd`name"),
        "`odd``name`"
    );
    assert_eq!(
        SqlBuilder::new(&Dialect::Access).quote_identifier("odd]name"),
        "[odd]]name]"
    );
}

#[test]
fn test_descriptor_copies_builtin_dialect() {
    for dialect in Dialect::ALL {
        let copy = DialectDescriptor::from_dialect(&dialect);
        assert_eq!(copy.capabilities, dialect.capabilities(), "{dialect}");
        assert_eq!(
            copy.quote_identifier("col"),
            dialect.quote_identifier("col"),
            "{dialect}"
        );
    }
}

// =============================================================================
// Against SQLite
// =============================================================================

#[test]
fn test_sqlite_counts_run() {
    let executor = SqliteExecutor::new();
    let b = SqlBuilder::new(&Dialect::Sqlite);
    let fact = TableName::new("sales_fact");

    assert_eq!(scalar(&executor, &b.table_count_sql(&fact)), 8);
    assert_eq!(
        scalar(
            &executor,
            &b.column_distinct_count_sql(&fact, "customer_id").unwrap()
        ),
        5
    );
    assert_eq!(
        scalar(
            &executor,
            &b.query_count_sql("SELECT DISTINCT store_state FROM sales_fact")
                .unwrap()
        ),
        2
    );
}

#[test]
fn test_sqlite_fallback_form_agrees_with_count_distinct() {
    let executor = SqliteExecutor::new();
    let no_distinct = DialectDescriptor::from_dialect(&Dialect::Sqlite).with_count_distinct(false);
    let sql = SqlBuilder::new(&no_distinct)
        .column_distinct_count_sql(&TableName::new("product_dim"), "category")
        .unwrap();

    assert!(!sql.contains("COUNT(DISTINCT"));
    assert_parses(&sql, Dialect::Sqlite);
    assert_eq!(scalar(&executor, &sql), 2);
}
