//! Dialect described by explicit flags.
//!
//! Deployments that talk to a database outside the built-in catalog hand the
//! engine a `DialectDescriptor` instead of a `Dialect` variant.

use serde::{Deserialize, Serialize};

use super::super::token::TokenStream;
use super::{helpers, Capabilities, SqlDialect};

/// Identifier quote characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierQuoting {
    #[default]
    Double,
    Backtick,
    Bracket,
}

/// A dialect assembled from capability flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use = "builders have no effect until used"]
pub struct DialectDescriptor {
    pub name: String,
    #[serde(default)]
    pub quoting: IdentifierQuoting,
    #[serde(default)]
    pub numeric_booleans: bool,
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl DialectDescriptor {
    /// A descriptor with ANSI defaults.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            quoting: IdentifierQuoting::Double,
            numeric_booleans: false,
            capabilities: Capabilities::default(),
        }
    }

    /// Copy the flags of an existing dialect.
    pub fn from_dialect(dialect: &dyn SqlDialect) -> Self {
        let quoted = dialect.quote_identifier("x");
        let quoting = if quoted.starts_with('`') {
            IdentifierQuoting::Backtick
        } else if quoted.starts_with('[') {
            IdentifierQuoting::Bracket
        } else {
            IdentifierQuoting::Double
        };
        Self {
            name: dialect.name().to_string(),
            quoting,
            numeric_booleans: dialect.format_bool(true) != "true"
                && dialect.format_bool(true) != "TRUE",
            capabilities: dialect.capabilities(),
        }
    }

    pub fn with_quoting(mut self, quoting: IdentifierQuoting) -> Self {
        self.quoting = quoting;
        self
    }

    pub fn with_count_distinct(mut self, allowed: bool) -> Self {
        self.capabilities.allows_count_distinct = allowed;
        self
    }

    pub fn with_from_query(mut self, allowed: bool) -> Self {
        self.capabilities.allows_from_query = allowed;
        self
    }

    pub fn with_alias_for_from_query(mut self, required: bool) -> Self {
        self.capabilities.requires_alias_for_from_query = required;
        self
    }

    pub fn with_as(mut self, allowed: bool) -> Self {
        self.capabilities.allows_as = allowed;
        self
    }

    pub fn with_top(mut self, uses_top: bool) -> Self {
        self.capabilities.uses_top = uses_top;
        self
    }
}

impl SqlDialect for DialectDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn quote_identifier(&self, ident: &str) -> String {
        match self.quoting {
            IdentifierQuoting::Double => helpers::quote_double(ident),
            IdentifierQuoting::Backtick => helpers::quote_backtick(ident),
            IdentifierQuoting::Bracket => helpers::quote_bracket(ident),
        }
    }

    fn format_bool(&self, b: bool) -> &'static str {
        if self.numeric_booleans {
            helpers::format_bool_numeric(b)
        } else {
            helpers::format_bool_literal(b)
        }
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        if self.capabilities.uses_top {
            TokenStream::new()
        } else {
            helpers::emit_limit_offset_standard(limit, offset)
        }
    }

    fn uses_top(&self) -> bool {
        self.capabilities.uses_top
    }

    fn allows_count_distinct(&self) -> bool {
        self.capabilities.allows_count_distinct
    }

    fn allows_from_query(&self) -> bool {
        self.capabilities.allows_from_query
    }

    fn requires_alias_for_from_query(&self) -> bool {
        self.capabilities.requires_alias_for_from_query
    }

    fn allows_as(&self) -> bool {
        self.capabilities.allows_as
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
