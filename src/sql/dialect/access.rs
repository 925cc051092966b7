//! Microsoft Access (Jet/ACE) dialect.
//!
//! Access has no `COUNT(DISTINCT ...)`; distinct counts go through a
//! `SELECT DISTINCT` derived table instead. Rows are limited with `TOP n`.

use super::super::token::TokenStream;
use super::helpers;
use super::SqlDialect;

/// Microsoft Access dialect.
#[derive(Debug, Clone, Copy)]
pub struct Access;

impl SqlDialect for Access {
    fn name(&self) -> &str {
        "access"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        // Jet stores TRUE as -1
        if b {
            "-1"
        } else {
            "0"
        }
    }

    fn emit_limit_offset(&self, _limit: Option<u64>, _offset: Option<u64>) -> TokenStream {
        TokenStream::new()
    }

    fn uses_top(&self) -> bool {
        true
    }

    fn allows_count_distinct(&self) -> bool {
        false
    }

    fn requires_alias_for_from_query(&self) -> bool {
        true
    }
}
