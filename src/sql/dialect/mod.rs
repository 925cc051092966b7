//! SQL dialect definitions and capability flags.
//!
//! Each dialect implements `SqlDialect` to describe how it quotes identifiers,
//! paginates, and which optional SQL forms it accepts. The statistics provider
//! and the cell reader never branch on a dialect's name; they only ask for
//! capabilities:
//!
//! | Dialect | COUNT(DISTINCT) | FROM (subquery) | alias required | `AS` for tables | limit |
//! |---------|-----------------|-----------------|----------------|-----------------|-------|
//! | ANSI | ✓ | ✓ | ❌ | ✓ | FETCH FIRST |
//! | PostgreSQL | ✓ | ✓ | ✓ | ✓ | LIMIT |
//! | DuckDB | ✓ | ✓ | ❌ | ✓ | LIMIT |
//! | SQL Server | ✓ | ✓ | ✓ | ✓ | OFFSET FETCH |
//! | MySQL | ✓ | ✓ | ✓ | ✓ | LIMIT |
//! | Snowflake | ✓ | ✓ | ❌ | ✓ | LIMIT |
//! | BigQuery | ✓ | ✓ | ❌ | ✓ | LIMIT |
//! | Redshift | ✓ | ✓ | ✓ | ✓ | LIMIT |
//! | Databricks | ✓ | ✓ | ✓ | ✓ | LIMIT |
//! | Oracle | ✓ | ✓ | ❌ | ❌ | FETCH FIRST |
//! | Access | ❌ | ✓ | ✓ | ✓ | TOP |
//! | SQLite | ✓ | ✓ | ❌ | ✓ | LIMIT |
//!
//! Databases outside the catalog are described with a [`DialectDescriptor`].
//!
//! # Usage
//!
//! ```ignore
//! use rolap::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("user");  // "user"
//! assert!(dialect.allows_count_distinct());
//! ```

mod access;
mod ansi;
mod bigquery;
mod databricks;
mod descriptor;
mod duckdb;
pub mod helpers;
mod mysql;
mod oracle;
mod postgres;
mod redshift;
mod snowflake;
mod sqlite;
mod tsql;

pub use access::Access;
pub use ansi::Ansi;
pub use bigquery::BigQuery;
pub use databricks::Databricks;
pub use descriptor::{DialectDescriptor, IdentifierQuoting};
pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use oracle::Oracle;
pub use postgres::Postgres;
pub use redshift::Redshift;
pub use snowflake::Snowflake;
pub use sqlite::Sqlite;
pub use tsql::TSql;

use serde::{Deserialize, Serialize};

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered and which
/// optional forms the database accepts.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    ///
    /// - ANSI/PostgreSQL/DuckDB: `"identifier"`
    /// - MySQL: `` `identifier` ``
    /// - T-SQL/Access: `[identifier]`
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All dialects use single quotes with `''` for escaping.
    /// Override for Unicode prefix (T-SQL N'...').
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    ///
    /// - PostgreSQL/DuckDB: `true`/`false`
    /// - MySQL/T-SQL: `1`/`0`
    fn format_bool(&self, b: bool) -> &'static str;

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET or equivalent trailing pagination clause.
    ///
    /// Dialects that limit with `SELECT TOP n` return an empty stream here and
    /// report `uses_top()`.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    /// Whether row limits are written as `SELECT TOP n`.
    fn uses_top(&self) -> bool {
        false
    }

    /// Whether this dialect requires ORDER BY for OFFSET/LIMIT.
    ///
    /// T-SQL requires ORDER BY when using OFFSET FETCH.
    fn requires_order_by_for_offset(&self) -> bool {
        false
    }

    // =========================================================================
    // Capability flags
    // =========================================================================

    /// Whether `COUNT(DISTINCT expr)` is accepted.
    fn allows_count_distinct(&self) -> bool {
        true
    }

    /// Whether a sub-select may appear in the FROM clause.
    fn allows_from_query(&self) -> bool {
        true
    }

    /// Whether a sub-select in FROM must carry an alias.
    fn requires_alias_for_from_query(&self) -> bool {
        false
    }

    /// Whether `AS` may precede a table or derived-table alias.
    ///
    /// When false the alias follows the relation after a single space.
    fn allows_as(&self) -> bool {
        true
    }

    /// Immutable snapshot of the capability flags.
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            allows_count_distinct: self.allows_count_distinct(),
            allows_from_query: self.allows_from_query(),
            requires_alias_for_from_query: self.requires_alias_for_from_query(),
            allows_as: self.allows_as(),
            uses_top: self.uses_top(),
        }
    }
}

/// Capability flags of one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    pub allows_count_distinct: bool,
    pub allows_from_query: bool,
    pub requires_alias_for_from_query: bool,
    pub allows_as: bool,
    pub uses_top: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            allows_count_distinct: true,
            allows_from_query: true,
            requires_alias_for_from_query: false,
            allows_as: true,
            uses_top: false,
        }
    }
}

/// Built-in SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Ansi,
    DuckDb,
    TSql,
    MySql,
    Postgres,
    Snowflake,
    BigQuery,
    Redshift,
    Databricks,
    Oracle,
    Access,
    Sqlite,
}

impl Dialect {
    /// Every built-in dialect, in catalog order.
    pub const ALL: [Dialect; 12] = [
        Dialect::Ansi,
        Dialect::DuckDb,
        Dialect::TSql,
        Dialect::MySql,
        Dialect::Postgres,
        Dialect::Snowflake,
        Dialect::BigQuery,
        Dialect::Redshift,
        Dialect::Databricks,
        Dialect::Oracle,
        Dialect::Access,
        Dialect::Sqlite,
    ];

    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Ansi => &Ansi,
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
            Dialect::TSql => &TSql,
            Dialect::MySql => &MySql,
            Dialect::Snowflake => &Snowflake,
            Dialect::BigQuery => &BigQuery,
            Dialect::Redshift => &Redshift,
            Dialect::Databricks => &Databricks,
            Dialect::Oracle => &Oracle,
            Dialect::Access => &Access,
            Dialect::Sqlite => &Sqlite,
        }
    }

    /// Look a dialect up by its name (case-insensitive).
    ///
    /// Accepts a few common aliases such as `mssql` and `postgresql`.
    pub fn from_name(name: &str) -> Option<Dialect> {
        let lower = name.trim().to_ascii_lowercase();
        let found = match lower.as_str() {
            "mssql" | "sqlserver" => Dialect::TSql,
            "postgresql" | "pg" => Dialect::Postgres,
            "spark" => Dialect::Databricks,
            other => return Dialect::ALL.into_iter().find(|d| d.name() == other),
        };
        Some(found)
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn uses_top(&self) -> bool {
        self.dialect().uses_top()
    }

    fn requires_order_by_for_offset(&self) -> bool {
        self.dialect().requires_order_by_for_offset()
    }

    fn allows_count_distinct(&self) -> bool {
        self.dialect().allows_count_distinct()
    }

    fn allows_from_query(&self) -> bool {
        self.dialect().allows_from_query()
    }

    fn requires_alias_for_from_query(&self) -> bool {
        self.dialect().requires_alias_for_from_query()
    }

    fn allows_as(&self) -> bool {
        self.dialect().allows_as()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
