//! Query results.
//!
//! A [`QueryResult`] owns the evaluator of one execution. Axis positions are
//! resolved when the result is built; cell values are evaluated when a
//! caller asks for them, so a client that reads a few cells of a large grid
//! only pays for those.
//!
//! Non-empty axes are filtered one candidate at a time: a position is kept
//! as soon as one combination with the other axes yields a non-null value,
//! so the full cross product is only walked for positions that are empty.

mod cell;
mod format;

pub use cell::{Cell, DrillThrough};
pub use format::{format_number, format_value};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::cache::CacheStats;
use crate::calc::{CalcRef, TupleList, Value};
use crate::error::ExecutionError;
use crate::eval::{Evaluator, Timings};
use crate::schema::MemberId;
use crate::sql::SqlDialect;
use crate::statement::StatementExecutor;

/// Signal used to abort an execution between two cell evaluations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where drill-through statements are sent.
#[derive(Clone)]
pub struct DrillThroughSource {
    pub dialect: Arc<dyn SqlDialect>,
    pub executor: Arc<dyn StatementExecutor>,
    /// Upper bound on rows returned by any drill-through.
    pub max_rows: u64,
}

impl std::fmt::Debug for DrillThroughSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrillThroughSource")
            .field("dialect", &self.dialect.name())
            .field("max_rows", &self.max_rows)
            .finish()
    }
}

#[derive(Debug)]
struct Axis {
    candidates: TupleList,
    /// Candidate indices that survived the non-empty filter.
    kept: Option<Vec<usize>>,
}

impl Axis {
    fn len(&self) -> usize {
        self.kept
            .as_ref()
            .map_or_else(|| self.candidates.len(), Vec::len)
    }

    fn position(&self, index: usize) -> Option<Vec<MemberId>> {
        let candidate = match &self.kept {
            Some(kept) => *kept.get(index)?,
            None => index,
        };
        self.candidates.get(candidate)
    }
}

/// The grid produced by one query execution.
#[derive(Debug)]
pub struct QueryResult {
    evaluator: Evaluator,
    slicer: CalcRef,
    axes: Vec<Axis>,
    cancel: CancellationToken,
    drill: Option<DrillThroughSource>,
}

impl QueryResult {
    /// Build a result over evaluated axis candidates.
    ///
    /// `axes` pairs each axis's candidate tuples with its non-empty flag.
    pub fn new(
        evaluator: Evaluator,
        slicer: CalcRef,
        axes: Vec<(TupleList, bool)>,
        cancel: CancellationToken,
    ) -> Result<Self, ExecutionError> {
        let mut result = Self {
            evaluator,
            slicer,
            axes: axes
                .iter()
                .map(|(candidates, _)| Axis {
                    candidates: candidates.clone(),
                    kept: None,
                })
                .collect(),
            cancel,
            drill: None,
        };

        for (index, (_, non_empty)) in axes.iter().enumerate() {
            if *non_empty {
                result.evaluator.timings_mut().mark_start("non_empty");
                let kept = result.non_empty_positions(index);
                result.evaluator.timings_mut().mark_end("non_empty");
                let kept = kept?;
                debug!(
                    axis = index,
                    candidates = result.axes[index].candidates.len(),
                    kept = kept.len(),
                    "non-empty filter applied"
                );
                result.axes[index].kept = Some(kept);
            }
        }
        Ok(result)
    }

    /// Allow drill-through on the cells of this result.
    pub fn with_drill_through(mut self, source: DrillThroughSource) -> Self {
        self.drill = Some(source);
        self
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Number of positions on `axis`, after non-empty filtering.
    pub fn axis_len(&self, axis: usize) -> Option<usize> {
        self.axes.get(axis).map(Axis::len)
    }

    /// Members of the tuple at `index` on `axis`.
    pub fn position(&self, axis: usize, index: usize) -> Option<Vec<MemberId>> {
        self.axes.get(axis)?.position(index)
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        self.axes.iter().map(Axis::len).product()
    }

    /// Evaluate the cell at `coordinate` (one position per axis).
    pub fn cell(&mut self, coordinate: &[usize]) -> Result<Cell, ExecutionError> {
        let invalid = || ExecutionError::InvalidCoordinate {
            coordinate: coordinate.to_vec(),
            lengths: self.axes.iter().map(Axis::len).collect(),
        };
        if coordinate.len() != self.axes.len() {
            return Err(invalid());
        }
        let mut tuples = Vec::with_capacity(coordinate.len());
        for (axis, &index) in self.axes.iter().zip(coordinate) {
            tuples.push(axis.position(index).ok_or_else(invalid)?);
        }
        self.check_cancelled()?;

        let slicer = Arc::clone(&self.slicer);
        self.evaluator.timings_mut().mark_start("cell");
        let (value, members) = self.evaluator.with_savepoint(|ev| {
            for tuple in &tuples {
                ev.set_tuple(tuple);
            }
            let value = ev.evaluate(slicer.as_ref()).unwrap_or_else(Value::Error);
            (value, ev.context().members().to_vec())
        });
        self.evaluator.timings_mut().mark_end("cell");

        Ok(Cell::new(
            coordinate.to_vec(),
            members,
            value,
            self.evaluator.shared_cube(),
            self.drill.clone(),
        ))
    }

    /// Evaluate every cell, axis 0 varying fastest.
    pub fn materialize(&mut self) -> Result<Vec<Cell>, ExecutionError> {
        let lengths: Vec<usize> = self.axes.iter().map(Axis::len).collect();
        let total = self.cell_count();
        let mut cells = Vec::with_capacity(total);
        for ordinal in 0..total {
            let coordinate = unravel(ordinal, &lengths);
            cells.push(self.cell(&coordinate)?);
        }
        Ok(cells)
    }

    pub fn timings(&self) -> &Timings {
        self.evaluator.timings()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.evaluator.cache_stats()
    }

    fn check_cancelled(&mut self) -> Result<(), ExecutionError> {
        if self.cancel.is_cancelled() {
            // entries computed so far must not outlive the execution
            self.evaluator.clear_cache();
            return Err(ExecutionError::Cancelled);
        }
        Ok(())
    }

    /// Candidate indices of `axis` with at least one non-null cell.
    fn non_empty_positions(&mut self, axis: usize) -> Result<Vec<usize>, ExecutionError> {
        let candidates = self.axes[axis].candidates.clone();
        let others: Vec<TupleList> = self
            .axes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != axis)
            .map(|(_, a)| a.candidates.clone())
            .collect();
        let other_lengths: Vec<usize> = others.iter().map(TupleList::len).collect();
        let combinations: usize = other_lengths.iter().product();
        let slicer = Arc::clone(&self.slicer);

        let mut kept = Vec::new();
        for (index, tuple) in candidates.iter().enumerate() {
            for ordinal in 0..combinations {
                self.check_cancelled()?;
                let offsets = unravel(ordinal, &other_lengths);
                let mut context = vec![tuple.clone()];
                context.extend(
                    others
                        .iter()
                        .zip(offsets)
                        .filter_map(|(list, offset)| list.get(offset)),
                );
                let value = self.evaluator.with_savepoint(|ev| {
                    for t in &context {
                        ev.set_tuple(t);
                    }
                    ev.evaluate(slicer.as_ref())
                });
                // an error is something to show, not an empty cell
                if !matches!(value, Ok(Value::Null)) {
                    kept.push(index);
                    break;
                }
            }
        }
        Ok(kept)
    }
}

/// Mixed-radix decomposition of `ordinal`, first length varying fastest.
fn unravel(mut ordinal: usize, lengths: &[usize]) -> Vec<usize> {
    lengths
        .iter()
        .map(|len| {
            let len = (*len).max(1);
            let offset = ordinal % len;
            ordinal /= len;
            offset
        })
        .collect()
}
