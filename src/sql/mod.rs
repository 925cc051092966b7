//! SQL generation module.
//!
//! A type-safe SQL builder that generates multi-dialect SQL:
//!
//! - [`builder`] - row-count, distinct-count and derived-table statements
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations and capability flags

pub mod builder;
pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use builder::{SqlBuilder, DERIVED_TABLE_ALIAS};
pub use dialect::{Capabilities, Dialect, DialectDescriptor, IdentifierQuoting, SqlDialect};
pub use expr::{
    avg, col, count, count_distinct, count_star, func, lit_bool, lit_float, lit_int, lit_null,
    lit_str, max, min, star, sum, table_col, BinaryOperator, Expr, ExprExt, Literal,
    UnaryOperator,
};
pub use query::{
    Join, JoinType, LimitOffset, OrderByExpr, Query, SelectExpr, SortDir, TableName, TableRef,
    TableSource,
};
pub use token::{Token, TokenStream};
