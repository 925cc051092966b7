//! Cell values read with aggregation SQL.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::star::star_query;
use super::CellReader;
use crate::calc::Value;
use crate::error::{EvalError, EvalResult};
use crate::schema::{Aggregator, Cube, HierarchyId, HierarchyRelation, Measure, MemberId};
use crate::sql::{avg, count, count_distinct, count_star, max, min, sum, table_col};
use crate::sql::{Expr, SelectExpr, SqlDialect, TableName};
use crate::statement::{Locus, Rows, SqlValue, StatementExecutor};
use crate::stats::{Cardinality, StatisticsProvider};

/// Reads stored-measure cells through the statement executor.
///
/// Every cell read is memoised for the lifetime of the reader (one query).
/// When a level is small enough, reading one member's cell loads the cells
/// of all its siblings with a single `GROUP BY` statement.
pub struct SqlCellReader {
    dialect: Arc<dyn SqlDialect>,
    executor: Arc<dyn StatementExecutor>,
    statistics: Option<Arc<dyn StatisticsProvider>>,
    prefetch_limit: u64,
    cells: HashMap<Vec<MemberId>, Value>,
    segment_levels: HashMap<(HierarchyId, usize), bool>,
}

impl std::fmt::Debug for SqlCellReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCellReader")
            .field("dialect", &self.dialect.name())
            .field("prefetch_limit", &self.prefetch_limit)
            .field("cells", &self.cells.len())
            .finish()
    }
}

impl SqlCellReader {
    pub fn new(dialect: Arc<dyn SqlDialect>, executor: Arc<dyn StatementExecutor>) -> Self {
        Self {
            dialect,
            executor,
            statistics: None,
            prefetch_limit: 0,
            cells: HashMap::new(),
            segment_levels: HashMap::new(),
        }
    }

    /// Enable segment prefetch for levels with at most `limit` members.
    pub fn with_prefetch(mut self, statistics: Arc<dyn StatisticsProvider>, limit: u64) -> Self {
        self.statistics = Some(statistics);
        self.prefetch_limit = limit;
        self
    }

    /// Number of memoised cells.
    pub fn cached_cells(&self) -> usize {
        self.cells.len()
    }

    fn aggregate_expr(&self, cube: &Cube, measure: &Measure) -> EvalResult<Expr> {
        let column = table_col(&cube.fact_table().name, &measure.column);
        Ok(match measure.aggregator {
            Aggregator::Sum => sum(column),
            Aggregator::Count => count(column),
            Aggregator::Min => min(column),
            Aggregator::Max => max(column),
            Aggregator::Avg => avg(column),
            Aggregator::DistinctCount => {
                if !self.dialect.allows_count_distinct() {
                    return Err(EvalError::Unsupported(format!(
                        "measure '{}' needs COUNT(DISTINCT), which {} does not support",
                        measure.name,
                        self.dialect.name()
                    )));
                }
                count_distinct(column)
            }
        })
    }

    /// The deepest-listed constrained member whose level qualifies for a
    /// segment load.
    fn prefetch_candidate(&mut self, cube: &Cube, coordinate: &[MemberId]) -> Option<MemberId> {
        let statistics = self.statistics.clone()?;
        let member_id = coordinate.iter().rev().copied().find(|id| {
            id.hierarchy != HierarchyId::MEASURES && cube.member(*id).is_some_and(|m| m.depth > 0)
        })?;
        let depth = cube.member(member_id)?.depth;

        if let Some(eligible) = self.segment_levels.get(&(member_id.hierarchy, depth)) {
            return eligible.then_some(member_id);
        }

        let hierarchy = cube.hierarchy(member_id.hierarchy);
        let column = hierarchy.level(depth)?.column.clone()?;
        let table: TableName = match hierarchy.relation() {
            HierarchyRelation::Table { table, .. } => table.clone(),
            _ => cube.fact_table().clone(),
        };
        let cardinality = statistics.column_cardinality(
            self.dialect.as_ref(),
            self.executor.as_ref(),
            &table,
            &column,
        );
        let eligible = matches!(cardinality, Cardinality::Known(n) if n <= self.prefetch_limit);
        debug!(
            hierarchy = hierarchy.name(),
            depth,
            %cardinality,
            eligible,
            "segment prefetch decision"
        );
        self.segment_levels
            .insert((member_id.hierarchy, depth), eligible);
        eligible.then_some(member_id)
    }

    fn execute(&self, sql: &str, locus: Locus) -> EvalResult<Rows> {
        debug!(%locus, sql, "reading cells");
        Ok(self.executor.execute(sql, &locus)?)
    }

    /// Load `free` and all its siblings in one statement.
    fn load_segment(
        &mut self,
        cube: &Cube,
        coordinate: &[MemberId],
        free: MemberId,
        measure: &Measure,
        aggregate: Expr,
    ) -> EvalResult<()> {
        let (query, Some(key_column)) = star_query(cube, coordinate, Some(free))? else {
            return Ok(());
        };
        let sql = query
            .select(vec![
                SelectExpr::new(key_column.clone()).with_alias("k"),
                SelectExpr::new(aggregate).with_alias("m"),
                SelectExpr::new(count_star()).with_alias("n"),
            ])
            .group_by(vec![key_column])
            .to_sql(self.dialect.as_ref());
        let rows = self.execute(
            &sql,
            Locus::new(
                "cell",
                format!("{} for siblings of {}", measure.name, describe(cube, &[free])),
            ),
        )?;

        let hierarchy = cube.hierarchy(free.hierarchy);
        for sibling in hierarchy.siblings(free) {
            let Some(key) = cube.member(sibling).and_then(|m| m.key.as_ref()) else {
                continue;
            };
            let value = rows
                .iter()
                .find(|row| row.first().is_some_and(|k| key.matches(k)))
                .and_then(|row| row.get(1..))
                .map_or(Value::Null, cell_value);
            let mut cell = coordinate.to_vec();
            cell[free.hierarchy.index()] = sibling;
            self.cells.insert(cell, value);
        }
        Ok(())
    }
}

impl CellReader for SqlCellReader {
    fn read(&mut self, cube: &Cube, coordinate: &[MemberId]) -> EvalResult<Value> {
        if let Some(value) = self.cells.get(coordinate) {
            return Ok(value.clone());
        }

        let measure_member = coordinate
            .get(HierarchyId::MEASURES.index())
            .copied()
            .ok_or_else(|| EvalError::Type("empty coordinate".into()))?;
        let measure = cube
            .member(measure_member)
            .and_then(|m| m.measure())
            .and_then(|id| cube.measure(id))
            .ok_or_else(|| EvalError::Type(format!("{measure_member} is not a stored measure")))?;
        let aggregate = self.aggregate_expr(cube, measure)?;

        if let Some(free) = self.prefetch_candidate(cube, coordinate) {
            self.load_segment(cube, coordinate, free, measure, aggregate.clone())?;
            if let Some(value) = self.cells.get(coordinate) {
                return Ok(value.clone());
            }
        }

        let (query, _) = star_query(cube, coordinate, None)?;
        let sql = query
            .select(vec![
                SelectExpr::new(aggregate).with_alias("m"),
                SelectExpr::new(count_star()).with_alias("n"),
            ])
            .to_sql(self.dialect.as_ref());
        let rows = self.execute(
            &sql,
            Locus::new(
                "cell",
                format!("{} at {}", measure.name, describe(cube, coordinate)),
            ),
        )?;
        let value = rows.iter().next().map_or(Value::Null, cell_value);
        self.cells.insert(coordinate.to_vec(), value.clone());
        Ok(value)
    }
}

/// `[m, n]` → the aggregate, or null when no fact row matched.
fn cell_value(row: &[SqlValue]) -> Value {
    let fact_rows = row.get(1).and_then(SqlValue::as_i64).unwrap_or(0);
    if fact_rows == 0 {
        return Value::Null;
    }
    row.first().and_then(SqlValue::as_f64).into()
}

fn describe(cube: &Cube, members: &[MemberId]) -> String {
    let names: Vec<&str> = members
        .iter()
        .filter_map(|m| cube.member(*m))
        .filter(|m| !m.is_all() && m.id.hierarchy != HierarchyId::MEASURES)
        .map(|m| m.unique_name.as_str())
        .collect();
    if names.is_empty() {
        "(all)".to_string()
    } else {
        names.join(", ")
    }
}
