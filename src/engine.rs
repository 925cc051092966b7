//! Query execution.
//!
//! ```text
//! Query ──prepare──▶ PreparedQuery ──run(Evaluator)──▶ QueryResult ──cell()──▶ Cell
//!          (compile axes,            (evaluate axes,                (evaluate slicer
//!           slicer, calculated        non-empty filter)              at a coordinate)
//!           members)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::calc::{CalcRef, TupleList, Value};
use crate::compiler::{compile_calculated_members, CompileHint, Compiler, FunctionRegistry};
use crate::config::{Settings, SettingsError};
use crate::error::{CompileError, CompileResult, EvalResult, ExecutionError};
use crate::eval::Evaluator;
use crate::query::Query;
use crate::reader::SqlCellReader;
use crate::result::{CancellationToken, DrillThroughSource, QueryResult};
use crate::schema::{Cube, MemberId};
use crate::sql::SqlDialect;
use crate::statement::StatementExecutor;
use crate::stats::{CachingStatisticsProvider, SqlStatisticsProvider, StatisticsProvider};

/// Executes queries against one cube.
///
/// An engine is cheap to share: every execution gets its own evaluator,
/// context and cache, while the dialect, executor and statistics provider
/// are shared.
pub struct Engine {
    cube: Arc<Cube>,
    dialect: Arc<dyn SqlDialect>,
    executor: Arc<dyn StatementExecutor>,
    statistics: Arc<dyn StatisticsProvider>,
    settings: Settings,
    registry: Arc<FunctionRegistry>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cube", &self.cube.name())
            .field("dialect", &self.dialect.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Engine {
    pub fn new(
        cube: Arc<Cube>,
        dialect: Arc<dyn SqlDialect>,
        executor: Arc<dyn StatementExecutor>,
    ) -> Self {
        Self {
            cube,
            dialect,
            executor,
            statistics: Arc::new(CachingStatisticsProvider::new(SqlStatisticsProvider::new())),
            settings: Settings::default(),
            registry: FunctionRegistry::standard(),
        }
    }

    /// An engine whose dialect comes from `settings`.
    pub fn from_settings(
        cube: Arc<Cube>,
        executor: Arc<dyn StatementExecutor>,
        settings: Settings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let dialect = settings.dialect.resolve()?;
        Ok(Self::new(cube, dialect, executor).with_settings(settings))
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_statistics(mut self, statistics: Arc<dyn StatisticsProvider>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn cube(&self) -> &Arc<Cube> {
        &self.cube
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Compile every expression of `query`.
    pub fn prepare(&self, query: &Query) -> CompileResult<PreparedQuery> {
        if let Some(unknown) = query.filter.iter().find(|m| self.cube.member(**m).is_none()) {
            return Err(CompileError::InvalidMember(unknown.to_string()));
        }
        let compiler = Compiler::new(&self.cube, &self.registry);
        let axes = query
            .axes
            .iter()
            .map(|axis| -> CompileResult<_> {
                Ok((compiler.compile(&axis.set, CompileHint::list())?, axis.non_empty))
            })
            .collect::<CompileResult<Vec<_>>>()?;
        let slicer = match &query.slicer {
            Some(exp) => compiler.compile_scalar(exp)?,
            None => compiler.current_measure_value()?,
        };
        let calculated = compile_calculated_members(&self.cube, &self.registry)?;
        debug!(
            axes = axes.len(),
            calculated = calculated.len(),
            "query compiled"
        );
        Ok(PreparedQuery {
            axes,
            slicer,
            filter: query.filter.clone(),
            calculated,
        })
    }

    /// A fresh evaluator for one execution.
    pub fn evaluator(&self) -> Evaluator {
        let mut reader = SqlCellReader::new(Arc::clone(&self.dialect), Arc::clone(&self.executor));
        if self.settings.statistics.enabled {
            reader = reader.with_prefetch(
                Arc::clone(&self.statistics),
                self.settings.engine.segment_prefetch_limit,
            );
        }
        Evaluator::new(Arc::clone(&self.cube), Box::new(reader), &self.settings.engine)
    }

    pub fn execute(&self, query: &Query) -> Result<QueryResult, ExecutionError> {
        self.execute_with_cancel(query, CancellationToken::new())
    }

    /// Execute `query`; `cancel` aborts it between two cell evaluations.
    pub fn execute_with_cancel(
        &self,
        query: &Query,
        cancel: CancellationToken,
    ) -> Result<QueryResult, ExecutionError> {
        let query_id = Uuid::new_v4();
        let span = info_span!("execute_query", %query_id, cube = self.cube.name());
        let _guard = span.enter();

        let prepared = self.prepare(query)?;
        let result = prepared.run(self.evaluator(), cancel)?;
        info!(
            axes = result.axis_count(),
            cells = result.cell_count(),
            "query executed"
        );
        Ok(result.with_drill_through(DrillThroughSource {
            dialect: Arc::clone(&self.dialect),
            executor: Arc::clone(&self.executor),
            max_rows: self.settings.engine.drill_through_max_rows,
        }))
    }
}

/// A compiled query, ready to run on an evaluator.
#[derive(Debug)]
pub struct PreparedQuery {
    axes: Vec<(CalcRef, bool)>,
    slicer: CalcRef,
    filter: Vec<MemberId>,
    calculated: HashMap<MemberId, CalcRef>,
}

impl PreparedQuery {
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn axis(&self, index: usize) -> Option<&CalcRef> {
        self.axes.get(index).map(|(calc, _)| calc)
    }

    pub fn slicer(&self) -> &CalcRef {
        &self.slicer
    }

    /// Evaluate the axes and build the result.
    ///
    /// The evaluator's cache is cleared first: cached values never carry
    /// over from one execution to the next.
    pub fn run(
        self,
        mut evaluator: Evaluator,
        cancel: CancellationToken,
    ) -> Result<QueryResult, ExecutionError> {
        evaluator.clear_cache();
        evaluator.set_calculated(self.calculated);
        for member in &self.filter {
            evaluator.set_member(*member);
        }

        let mut axes = Vec::with_capacity(self.axes.len());
        for (index, (calc, non_empty)) in self.axes.iter().enumerate() {
            if cancel.is_cancelled() {
                evaluator.clear_cache();
                return Err(ExecutionError::Cancelled);
            }
            evaluator.timings_mut().mark_start("axis");
            let value = evaluator.evaluate(calc.as_ref());
            evaluator.timings_mut().mark_end("axis");
            let list = value
                .and_then(list_of)
                .map_err(|source| ExecutionError::Eval { axis: index, source })?;
            axes.push((list, *non_empty));
        }

        QueryResult::new(evaluator, self.slicer, axes, cancel)
    }
}

fn list_of(value: Value) -> EvalResult<TupleList> {
    match value {
        Value::Null => Ok(TupleList::empty()),
        Value::Member(m) => Ok(TupleList::from_members([m])),
        Value::Tuple(t) => Ok(TupleList::from_tuples(vec![t])),
        other => other.into_list(),
    }
}
