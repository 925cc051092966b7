//! Depth-first evaluation of calculation trees.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use super::{Context, Savepoint, Timings};
use crate::cache::{CacheStats, EvaluationCache};
use crate::calc::{Calc, CalcRef, Value};
use crate::config::EngineSettings;
use crate::error::{EvalError, EvalResult};
use crate::reader::CellReader;
use crate::schema::{Cube, HierarchyId, MemberId, MemberKind};

/// Executes calculations against a mutable [`Context`].
///
/// Owned by exactly one query execution: the context, cache and reader are
/// never shared between threads.
pub struct Evaluator {
    cube: Arc<Cube>,
    context: Context,
    cache: EvaluationCache,
    reader: Box<dyn CellReader>,
    calculated: HashMap<MemberId, CalcRef>,
    cache_enabled: bool,
    max_depth: usize,
    depth: usize,
    timings: Timings,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("cube", &self.cube.name())
            .field("context", &self.context)
            .field("cache", &self.cache.stats())
            .field("depth", &self.depth)
            .finish()
    }
}

impl Evaluator {
    /// An evaluator positioned on every hierarchy's default member.
    pub fn new(cube: Arc<Cube>, reader: Box<dyn CellReader>, settings: &EngineSettings) -> Self {
        let context = Context::new(cube.default_context());
        Self {
            cube,
            context,
            cache: EvaluationCache::new(),
            reader,
            calculated: HashMap::new(),
            cache_enabled: settings.cache_enabled,
            max_depth: settings.max_eval_depth,
            depth: 0,
            timings: Timings::new(),
        }
    }

    pub fn cube(&self) -> &Cube {
        &self.cube
    }

    pub fn shared_cube(&self) -> Arc<Cube> {
        Arc::clone(&self.cube)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn timings_mut(&mut self) -> &mut Timings {
        &mut self.timings
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every memoised result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Install compiled calculated members.
    pub fn set_calculated(&mut self, calculated: HashMap<MemberId, CalcRef>) {
        self.calculated = calculated;
    }

    // =========================================================================
    // Context
    // =========================================================================

    pub fn set_member(&mut self, member: MemberId) {
        self.context.set_member(member);
    }

    pub fn set_tuple(&mut self, tuple: &[MemberId]) {
        self.context.set_tuple(tuple);
    }

    pub fn savepoint(&mut self) -> Savepoint {
        self.context.savepoint()
    }

    pub fn restore(&mut self, savepoint: Savepoint) {
        self.context.restore(savepoint);
    }

    /// Run `f` and restore the context afterwards, whatever `f` returns.
    pub fn with_savepoint<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let savepoint = self.context.savepoint();
        let result = f(self);
        self.context.restore(savepoint);
        result
    }

    /// Evaluate `calc` with `tuple` selected.
    pub fn evaluate_at(&mut self, tuple: &[MemberId], calc: &dyn Calc) -> EvalResult<Value> {
        self.with_savepoint(|ev| {
            ev.set_tuple(tuple);
            ev.evaluate(calc)
        })
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluate `calc` in the current context.
    ///
    /// Cacheable nodes are looked up by their key and the fingerprint of
    /// their dependencies. Errors are never cached.
    pub fn evaluate(&mut self, calc: &dyn Calc) -> EvalResult<Value> {
        if self.depth >= self.max_depth {
            return Err(EvalError::RecursionLimit(self.max_depth));
        }

        let header = calc.header();
        let fingerprint = if self.cache_enabled && calc.is_cacheable() {
            let fingerprint = self.context.fingerprint(&header.dependencies);
            if let Some(value) = self.cache.get(&header.key, &fingerprint) {
                trace!(key = %header.key, "evaluation cache hit");
                return Ok(value);
            }
            Some(fingerprint)
        } else {
            None
        };

        self.depth += 1;
        let result = calc.evaluate(self);
        self.depth -= 1;

        if let (Some(fingerprint), Ok(value)) = (fingerprint, &result) {
            self.cache.put(header.key.clone(), fingerprint, value.clone());
        }
        result
    }

    /// Value of the current measure at the current coordinate.
    pub fn current_value(&mut self) -> EvalResult<Value> {
        let measure = self.context.member(HierarchyId::MEASURES);
        let kind = self
            .cube
            .member(measure)
            .map(|m| &m.kind)
            .ok_or_else(|| EvalError::Type(format!("unknown measure {measure}")))?;

        match kind {
            MemberKind::Measure(_) => {
                let coordinate = self.context.members().to_vec();
                self.timings.mark_start("read_cell");
                let value = self.reader.read(&self.cube, &coordinate);
                self.timings.mark_end("read_cell");
                value
            }
            MemberKind::Calculated { .. } => {
                let calc = self.calculated.get(&measure).cloned().ok_or_else(|| {
                    EvalError::Compile(format!(
                        "calculated member {measure} has not been compiled"
                    ))
                })?;
                self.evaluate(calc.as_ref())
            }
            _ => Err(EvalError::Type(format!("{measure} is not a measure"))),
        }
    }
}
