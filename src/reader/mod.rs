//! Reading stored-measure cells.
//!
//! The evaluator asks a [`CellReader`] for the value of a stored measure at
//! a full coordinate. [`SqlCellReader`] answers with aggregation SQL over the
//! star schema; tests substitute in-memory readers.

mod sql;
mod star;

pub use sql::SqlCellReader;
pub use star::{drill_through_sql, star_query};

use crate::error::EvalResult;
use crate::calc::Value;
use crate::schema::{Cube, MemberId};

/// Supplies stored-measure values.
pub trait CellReader: Send {
    /// Value at `coordinate`: one member per hierarchy, in hierarchy order,
    /// with a stored measure on the measures hierarchy.
    fn read(&mut self, cube: &Cube, coordinate: &[MemberId]) -> EvalResult<Value>;
}
