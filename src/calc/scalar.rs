//! Scalar arithmetic, comparison and logic.

use std::cmp::Ordering;

use serde::Serialize;

use super::{Calc, CalcHeader, CalcRef, HierarchySet, ResultType, Value};
use crate::error::{CompileResult, EvalError, EvalResult};
use crate::eval::Evaluator;

// =============================================================================
// Constants
// =============================================================================

/// A literal.
#[derive(Debug)]
pub struct ConstantCalc {
    header: CalcHeader,
    value: Value,
}

#[derive(Serialize)]
enum ConstantKey<'a> {
    Null,
    Number(f64),
    String(&'a str),
    Bool(bool),
}

impl ConstantCalc {
    pub fn new(value: Value) -> CompileResult<CalcRef> {
        let (result_type, key) = match &value {
            Value::Number(n) => (ResultType::Numeric, ConstantKey::Number(*n)),
            Value::String(s) => (ResultType::String, ConstantKey::String(s)),
            Value::Bool(b) => (ResultType::Boolean, ConstantKey::Bool(*b)),
            _ => (ResultType::Scalar, ConstantKey::Null),
        };
        let header = CalcHeader::new("Constant", result_type, HierarchySet::new(), &[], key)?;
        Ok(std::sync::Arc::new(Self {
            header,
            value: match value {
                v @ (Value::Number(_) | Value::String(_) | Value::Bool(_)) => v,
                _ => Value::Null,
            },
        }))
    }

    pub fn number(n: f64) -> CompileResult<CalcRef> {
        Self::new(Value::Number(n))
    }
}

impl Calc for ConstantCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, _evaluator: &mut Evaluator) -> EvalResult<Value> {
        Ok(self.value.clone())
    }
}

// =============================================================================
// Binary operators
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Lt,
    Lte,
    Eq,
    Ne,
    Gt,
    Gte,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol.to_ascii_lowercase().as_str() {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Subtract,
            "*" => BinaryOp::Multiply,
            "/" => BinaryOp::Divide,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Lte,
            "=" => BinaryOp::Eq,
            "<>" => BinaryOp::Ne,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Gte,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            _ => return None,
        })
    }

    fn result_type(self) -> ResultType {
        match self {
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
                ResultType::Numeric
            }
            _ => ResultType::Boolean,
        }
    }
}

/// `left op right`
#[derive(Debug)]
pub struct BinaryCalc {
    header: CalcHeader,
    op: BinaryOp,
    left: CalcRef,
    right: CalcRef,
}

impl BinaryCalc {
    pub fn new(op: BinaryOp, left: CalcRef, right: CalcRef) -> CompileResult<CalcRef> {
        let dependencies = HierarchySet::of_all([&left, &right]);
        let header = CalcHeader::new("Binary", op.result_type(), dependencies, &[&left, &right], op)?;
        Ok(std::sync::Arc::new(Self {
            header,
            op,
            left,
            right,
        }))
    }
}

impl Calc for BinaryCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        match self.op {
            BinaryOp::And => {
                let left = evaluator.evaluate(self.left.as_ref())?.truthy()?;
                if !left {
                    return Ok(Value::Bool(false));
                }
                let right = evaluator.evaluate(self.right.as_ref())?.truthy()?;
                return Ok(Value::Bool(right));
            }
            BinaryOp::Or => {
                let left = evaluator.evaluate(self.left.as_ref())?.truthy()?;
                if left {
                    return Ok(Value::Bool(true));
                }
                let right = evaluator.evaluate(self.right.as_ref())?.truthy()?;
                return Ok(Value::Bool(right));
            }
            _ => {}
        }

        let left = evaluator.evaluate(self.left.as_ref())?;
        let right = evaluator.evaluate(self.right.as_ref())?;
        match self.op {
            BinaryOp::Add | BinaryOp::Subtract => {
                let (l, r) = (left.as_number()?, right.as_number()?);
                if l.is_none() && r.is_none() {
                    return Ok(Value::Null);
                }
                let (l, r) = (l.unwrap_or(0.0), r.unwrap_or(0.0));
                Ok(Value::Number(if self.op == BinaryOp::Add {
                    l + r
                } else {
                    l - r
                }))
            }
            BinaryOp::Multiply => match (left.as_number()?, right.as_number()?) {
                (Some(l), Some(r)) => Ok(Value::Number(l * r)),
                _ => Ok(Value::Null),
            },
            BinaryOp::Divide => match (left.as_number()?, right.as_number()?) {
                (Some(_), Some(r)) if r == 0.0 => Err(EvalError::DivisionByZero),
                (Some(l), Some(r)) => Ok(Value::Number(l / r)),
                _ => Ok(Value::Null),
            },
            op => {
                let ordering = compare(&left, &right)?;
                Ok(Value::Bool(match op {
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::Lte => ordering != Ordering::Greater,
                    BinaryOp::Eq => ordering == Ordering::Equal,
                    BinaryOp::Ne => ordering != Ordering::Equal,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }))
            }
        }
    }
}

/// Strings compare as strings (null as ""); everything else as numbers
/// with null as 0.
fn compare(left: &Value, right: &Value) -> EvalResult<Ordering> {
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            let as_str = |v: &Value| -> EvalResult<String> {
                match v {
                    Value::String(s) => Ok(s.clone()),
                    Value::Null => Ok(String::new()),
                    other => Ok(other.as_number()?.unwrap_or(0.0).to_string()),
                }
            };
            Ok(as_str(left)?.cmp(&as_str(right)?))
        }
        _ => {
            let l = left.as_number()?.unwrap_or(0.0);
            let r = right.as_number()?.unwrap_or(0.0);
            Ok(l.partial_cmp(&r).unwrap_or(Ordering::Equal))
        }
    }
}

// =============================================================================
// Unary operators
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Negate,
    Not,
    IsEmpty,
}

/// `op operand`
#[derive(Debug)]
pub struct UnaryCalc {
    header: CalcHeader,
    op: UnaryOp,
    operand: CalcRef,
}

impl UnaryCalc {
    pub fn new(op: UnaryOp, operand: CalcRef) -> CompileResult<CalcRef> {
        let result_type = match op {
            UnaryOp::Negate => ResultType::Numeric,
            UnaryOp::Not | UnaryOp::IsEmpty => ResultType::Boolean,
        };
        let dependencies = operand.header().dependencies.clone();
        let header = CalcHeader::new("Unary", result_type, dependencies, &[&operand], op)?;
        Ok(std::sync::Arc::new(Self {
            header,
            op,
            operand,
        }))
    }
}

impl Calc for UnaryCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let value = evaluator.evaluate(self.operand.as_ref())?;
        match self.op {
            UnaryOp::Negate => Ok(value.as_number()?.map(|n| -n).into()),
            UnaryOp::Not => Ok(Value::Bool(!value.truthy()?)),
            UnaryOp::IsEmpty => Ok(Value::Bool(value.is_null())),
        }
    }
}

// =============================================================================
// Conditionals
// =============================================================================

/// `IIf(condition, then, else)`; only the chosen branch is evaluated.
#[derive(Debug)]
pub struct IifCalc {
    header: CalcHeader,
    condition: CalcRef,
    then: CalcRef,
    otherwise: CalcRef,
}

impl IifCalc {
    pub fn new(condition: CalcRef, then: CalcRef, otherwise: CalcRef) -> CompileResult<CalcRef> {
        let then_type = &then.header().result_type;
        let result_type = if then_type == &otherwise.header().result_type {
            then_type.clone()
        } else {
            ResultType::Scalar
        };
        let dependencies = HierarchySet::of_all([&condition, &then, &otherwise]);
        let header = CalcHeader::new(
            "IIf",
            result_type,
            dependencies,
            &[&condition, &then, &otherwise],
            (),
        )?;
        Ok(std::sync::Arc::new(Self {
            header,
            condition,
            then,
            otherwise,
        }))
    }
}

impl Calc for IifCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        if evaluator.evaluate(self.condition.as_ref())?.truthy()? {
            evaluator.evaluate(self.then.as_ref())
        } else {
            evaluator.evaluate(self.otherwise.as_ref())
        }
    }
}

/// `CoalesceEmpty(a, b, ...)`: the first non-null operand.
#[derive(Debug)]
pub struct CoalesceEmptyCalc {
    header: CalcHeader,
    operands: Vec<CalcRef>,
}

impl CoalesceEmptyCalc {
    pub fn new(operands: Vec<CalcRef>) -> CompileResult<CalcRef> {
        let children: Vec<&CalcRef> = operands.iter().collect();
        let first_type = operands.first().map(|c| c.header().result_type.clone());
        let result_type = match first_type {
            Some(t) if operands.iter().all(|c| c.header().result_type == t) => t,
            _ => ResultType::Scalar,
        };
        let header = CalcHeader::new(
            "CoalesceEmpty",
            result_type,
            HierarchySet::of_all(operands.iter()),
            &children,
            (),
        )?;
        Ok(std::sync::Arc::new(Self { header, operands }))
    }
}

impl Calc for CoalesceEmptyCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        for operand in &self.operands {
            let value = evaluator.evaluate(operand.as_ref())?;
            if !value.is_null() {
                return Ok(value);
            }
        }
        Ok(Value::Null)
    }
}
