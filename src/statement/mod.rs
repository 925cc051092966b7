//! Statement execution boundary.
//!
//! The engine never talks to a database directly. Every statement it
//! generates goes through a [`StatementExecutor`] supplied by the deployment,
//! together with a [`Locus`] describing why it is being run.
//!
//! ```text
//! ┌──────────────────────────┐      SQL + Locus      ┌─────────────────────┐
//! │ SqlCellReader            │ ────────────────────▶ │ StatementExecutor   │
//! │ SqlStatisticsProvider    │ ◀──────────────────── │ (driver, pool, ...) │
//! │ Cell::drill_through      │    Rows / StatementError                    │
//! └──────────────────────────┘                       └─────────────────────┘
//! ```

mod error;
mod rows;

pub use error::{StatementError, StatementResult};
pub use rows::{Rows, SqlValue};

/// Logical description of a statement, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    /// Component issuing the statement, e.g. `"statistics"`.
    pub component: &'static str,
    /// What the statement computes.
    pub purpose: String,
}

impl Locus {
    pub fn new(component: &'static str, purpose: impl Into<String>) -> Self {
        Self {
            component,
            purpose: purpose.into(),
        }
    }
}

impl std::fmt::Display for Locus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.component, self.purpose)
    }
}

/// Runs SQL on behalf of the engine.
///
/// Implementations must be shareable across concurrently executing queries.
pub trait StatementExecutor: Send + Sync {
    fn execute(&self, sql: &str, locus: &Locus) -> StatementResult<Rows>;
}
