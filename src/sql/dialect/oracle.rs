//! Oracle SQL dialect.
//!
//! Oracle rejects `AS` before a table alias (`FROM t x`, never `FROM t AS x`)
//! and has no boolean SQL type before 23c.

use super::super::token::TokenStream;
use super::helpers;
use super::SqlDialect;

/// Oracle SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Oracle;

impl SqlDialect for Oracle {
    fn name(&self) -> &str {
        "oracle"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_fetch_first(limit, offset)
    }

    fn allows_as(&self) -> bool {
        false
    }
}
