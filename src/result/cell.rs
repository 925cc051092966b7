//! One evaluated cell.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use super::format::format_value;
use super::DrillThroughSource;
use crate::calc::Value;
use crate::error::EvalError;
use crate::reader::drill_through_sql;
use crate::schema::{Cube, HierarchyId, MemberId};
use crate::statement::{Locus, Rows, StatementError};

/// Outcome of a drill-through request.
#[derive(Debug, Clone, PartialEq)]
pub enum DrillThrough {
    /// Fact rows under the cell. May be empty.
    Rows(Rows),
    /// The cell has no fact-level detail.
    Unsupported(String),
}

impl DrillThrough {
    pub fn is_supported(&self) -> bool {
        matches!(self, DrillThrough::Rows(_))
    }
}

/// A read-only view of one cell of a [`QueryResult`](super::QueryResult).
#[derive(Debug)]
pub struct Cell {
    coordinate: Vec<usize>,
    members: Vec<MemberId>,
    value: Value,
    format_string: Option<String>,
    formatted: OnceCell<String>,
    cube: Arc<Cube>,
    drill: Option<DrillThroughSource>,
}

impl Cell {
    pub(super) fn new(
        coordinate: Vec<usize>,
        members: Vec<MemberId>,
        value: Value,
        cube: Arc<Cube>,
        drill: Option<DrillThroughSource>,
    ) -> Self {
        let format_string = members
            .get(HierarchyId::MEASURES.index())
            .and_then(|m| cube.format_string(*m))
            .map(String::from);
        Self {
            coordinate,
            members,
            value,
            format_string,
            formatted: OnceCell::new(),
            cube,
            drill,
        }
    }

    /// Position on each axis.
    pub fn coordinate(&self) -> &[usize] {
        &self.coordinate
    }

    /// Full context the cell was evaluated in, one member per hierarchy.
    pub fn members(&self) -> &[MemberId] {
        &self.members
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn format_string(&self) -> Option<&str> {
        self.format_string.as_deref()
    }

    /// The value rendered with its measure's format string.
    pub fn formatted_value(&self) -> &str {
        self.formatted
            .get_or_init(|| format_value(&self.value, self.format_string.as_deref()))
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_error(&self) -> bool {
        self.value.is_error()
    }

    pub fn error(&self) -> Option<&EvalError> {
        match &self.value {
            Value::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Fetch up to `max_rows` fact rows that contribute to this cell.
    ///
    /// Returns [`DrillThrough::Unsupported`] when the cell's measure is
    /// calculated or the result was produced without a statement executor.
    pub fn drill_through(&self, max_rows: u64) -> Result<DrillThrough, StatementError> {
        let Some(source) = &self.drill else {
            return Ok(DrillThrough::Unsupported(
                "result has no statement executor".into(),
            ));
        };
        let measure = self
            .members
            .get(HierarchyId::MEASURES.index())
            .and_then(|m| self.cube.member(*m));
        match measure {
            Some(m) if m.measure().is_some() => {}
            Some(m) => {
                return Ok(DrillThrough::Unsupported(format!(
                    "{} is not a stored measure",
                    m.unique_name
                )))
            }
            None => return Ok(DrillThrough::Unsupported("cell has no measure".into())),
        }

        let max_rows = max_rows.min(source.max_rows);
        let sql = match drill_through_sql(
            &self.cube,
            source.dialect.as_ref(),
            &self.members,
            max_rows,
        ) {
            Ok(sql) => sql,
            // no fact-row mapping for this coordinate
            Err(err) => return Ok(DrillThrough::Unsupported(err.to_string())),
        };
        let locus = Locus::new("drill-through", format!("cell {:?}", self.coordinate));
        debug!(%locus, sql, "drilling through");
        source.executor.execute(&sql, &locus).map(DrillThrough::Rows)
    }
}
