//! Cell values and aggregation.

use std::sync::Arc;

use serde::Serialize;

use super::set::iteration_dependencies;
use super::{Calc, CalcHeader, CalcRef, HierarchySet, ResultType, TupleList, Value};
use crate::error::{CompileResult, EvalResult};
use crate::eval::Evaluator;
use crate::schema::HierarchyId;

/// Value of the current measure at the current coordinate.
#[derive(Debug)]
pub struct CurrentMeasureValueCalc {
    header: CalcHeader,
}

impl CurrentMeasureValueCalc {
    /// Depends on every hierarchy of the cube.
    pub fn new(hierarchies: impl IntoIterator<Item = HierarchyId>) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "CurrentMeasureValue",
            ResultType::Scalar,
            hierarchies.into_iter().collect(),
            &[],
            (),
        )?;
        Ok(Arc::new(Self { header }))
    }
}

impl Calc for CurrentMeasureValueCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        evaluator.current_value()
    }
}

/// Value at the current coordinate with one member substituted, e.g.
/// `[Measures].[Sales]` used as a number.
#[derive(Debug)]
pub struct MemberValueCalc {
    header: CalcHeader,
    member: CalcRef,
}

impl MemberValueCalc {
    pub fn new(member: CalcRef) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "MemberValue",
            ResultType::Scalar,
            member.header().dependencies.clone(),
            &[&member],
            (),
        )?;
        Ok(Arc::new(Self { header, member }))
    }
}

impl Calc for MemberValueCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        match evaluator.evaluate(self.member.as_ref())?.as_member()? {
            Some(member) => evaluator.with_savepoint(|ev| {
                ev.set_member(member);
                ev.current_value()
            }),
            None => Ok(Value::Null),
        }
    }
}

/// Value at a tuple, e.g. `([Measures].[Sales], [Time].[1997])`.
#[derive(Debug)]
pub struct TupleValueCalc {
    header: CalcHeader,
    tuple: CalcRef,
}

impl TupleValueCalc {
    pub fn new(tuple: CalcRef) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "TupleValue",
            ResultType::Scalar,
            tuple.header().dependencies.clone(),
            &[&tuple],
            (),
        )?;
        Ok(Arc::new(Self { header, tuple }))
    }
}

impl Calc for TupleValueCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        match evaluator.evaluate(self.tuple.as_ref())? {
            Value::Null => Ok(Value::Null),
            value => {
                let tuple = value.into_tuple()?;
                evaluator.with_savepoint(|ev| {
                    ev.set_tuple(&tuple);
                    ev.current_value()
                })
            }
        }
    }
}

/// Aggregate functions over a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggregateKind {
    Sum,
    Avg,
    Min,
    Max,
    /// Number of tuples; with `exclude_empty` only tuples whose value is
    /// not null are counted.
    Count { exclude_empty: bool },
}

/// `Sum(set, value)` and friends. Nulls are skipped; an all-null input
/// aggregates to null.
#[derive(Debug)]
pub struct AggregateCalc {
    header: CalcHeader,
    kind: AggregateKind,
    set: CalcRef,
    value: CalcRef,
}

impl AggregateCalc {
    pub fn new(kind: AggregateKind, set: CalcRef, value: CalcRef) -> CompileResult<CalcRef> {
        let dependencies = match kind {
            AggregateKind::Count {
                exclude_empty: false,
            } => set.header().dependencies.clone(),
            _ => iteration_dependencies(&set, &value),
        };
        let header = CalcHeader::new(
            "Aggregate",
            ResultType::Numeric,
            dependencies,
            &[&set, &value],
            kind,
        )?;
        Ok(Arc::new(Self {
            header,
            kind,
            set,
            value,
        }))
    }

    pub fn kind(&self) -> AggregateKind {
        self.kind
    }
}

impl Calc for AggregateCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let list = match evaluator.evaluate(self.set.as_ref())? {
            Value::List(list) => list,
            Value::Null => TupleList::empty(),
            other => TupleList::from_tuples(vec![other.into_tuple()?]),
        };

        if self.kind == (AggregateKind::Count { exclude_empty: false }) {
            return Ok(Value::Number(list.len() as f64));
        }

        let mut count = 0usize;
        let mut values = Vec::new();
        for tuple in list.iter() {
            let value = evaluator.evaluate_at(&tuple, self.value.as_ref())?;
            if let Some(n) = value.as_number()? {
                values.push(n);
            }
            if !value.is_null() {
                count += 1;
            }
        }

        if let AggregateKind::Count { .. } = self.kind {
            return Ok(Value::Number(count as f64));
        }
        if values.is_empty() {
            return Ok(Value::Null);
        }
        let result = match self.kind {
            AggregateKind::Sum => values.iter().sum(),
            AggregateKind::Avg => values.iter().sum::<f64>() / values.len() as f64,
            AggregateKind::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregateKind::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregateKind::Count { .. } => count as f64,
        };
        Ok(Value::Number(result))
    }

    fn is_cacheable(&self) -> bool {
        true
    }
}
