//! Executable calculation nodes.
//!
//! The compiler turns each query expression into a tree of [`Calc`] nodes.
//! Every node carries a [`CalcHeader`]: a structural key (two nodes built
//! from the same expression get the same key), the shape of its result, and
//! the hierarchies whose current member can change that result. The
//! evaluation cache is keyed on the header alone.
//!
//! Dependency rules:
//!
//! | Node                          | Depends on                                  |
//! |-------------------------------|---------------------------------------------|
//! | constant, member literal      | nothing                                     |
//! | `h.CurrentMember`             | `h`                                         |
//! | value of the current measure  | every hierarchy                             |
//! | value of a member/tuple       | whatever selects the member/tuple           |
//! | aggregate/filter over a set   | set ∪ (value − hierarchies of the set)      |
//! | anything else                 | union of its children                       |

mod list;
mod member;
mod scalar;
mod set;
mod value;

pub use list::TupleList;
pub use member::{
    ConstantMemberCalc, CurrentMemberCalc, DefaultMemberCalc, MemberNameCalc, MemberNav,
    MemberNavCalc, TupleCalc,
};
pub use scalar::{
    BinaryCalc, BinaryOp, CoalesceEmptyCalc, ConstantCalc, IifCalc, UnaryCalc, UnaryOp,
};
pub use set::{
    ChildrenCalc, CrossJoinCalc, DescendantsCalc, FilterCalc, HeadTailCalc, LevelMembersCalc,
    HierarchyMembersCalc, NonEmptyCalc, SetLiteralCalc, UnionCalc,
};
pub use value::{AggregateCalc, AggregateKind, CurrentMeasureValueCalc, MemberValueCalc, TupleValueCalc};

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::key_digest;
use crate::error::{CompileResult, EvalError, EvalResult};
use crate::eval::Evaluator;
use crate::schema::{HierarchyId, MemberId};

/// Shared handle to a compiled node.
pub type CalcRef = Arc<dyn Calc>;

/// An executable calculation.
pub trait Calc: fmt::Debug + Send + Sync {
    fn header(&self) -> &CalcHeader;

    /// Compute the node's value in the evaluator's current context.
    ///
    /// Child nodes are evaluated through [`Evaluator::evaluate`], never by
    /// calling this method directly, so caching and depth limits apply.
    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value>;

    /// Whether results may be memoised by the evaluation cache.
    fn is_cacheable(&self) -> bool {
        false
    }
}

/// Structural identity of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalcKey(Arc<str>);

impl CalcKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape of a node's result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ResultType {
    Numeric,
    String,
    Boolean,
    /// Any scalar; the concrete type is only known at runtime.
    Scalar,
    Member(HierarchyId),
    Tuple(Vec<HierarchyId>),
    List(Vec<HierarchyId>),
}

impl ResultType {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ResultType::Numeric | ResultType::String | ResultType::Boolean | ResultType::Scalar
        )
    }

    /// Hierarchies a member, tuple or set ranges over.
    pub fn hierarchies(&self) -> Vec<HierarchyId> {
        match self {
            ResultType::Member(h) => vec![*h],
            ResultType::Tuple(hs) | ResultType::List(hs) => hs.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultType::Numeric => f.write_str("numeric"),
            ResultType::String => f.write_str("string"),
            ResultType::Boolean => f.write_str("boolean"),
            ResultType::Scalar => f.write_str("scalar"),
            ResultType::Member(_) => f.write_str("member"),
            ResultType::Tuple(_) => f.write_str("tuple"),
            ResultType::List(_) => f.write_str("set"),
        }
    }
}

/// A sorted set of hierarchies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HierarchySet(BTreeSet<HierarchyId>);

impl HierarchySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(h: HierarchyId) -> Self {
        Self(BTreeSet::from([h]))
    }

    pub fn contains(&self, h: HierarchyId) -> bool {
        self.0.contains(&h)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = HierarchyId> + '_ {
        self.0.iter().copied()
    }

    pub fn insert(&mut self, h: HierarchyId) {
        self.0.insert(h);
    }

    #[must_use]
    pub fn union(&self, other: &HierarchySet) -> HierarchySet {
        Self(self.0.union(&other.0).copied().collect())
    }

    /// `self` without the given hierarchies.
    #[must_use]
    pub fn without(&self, pinned: &[HierarchyId]) -> HierarchySet {
        Self(self.0.iter().copied().filter(|h| !pinned.contains(h)).collect())
    }

    /// Union of the dependencies of several nodes.
    pub fn of_all<'a>(calcs: impl IntoIterator<Item = &'a CalcRef>) -> HierarchySet {
        calcs.into_iter().fold(HierarchySet::new(), |acc, c| {
            acc.union(&c.header().dependencies)
        })
    }
}

impl FromIterator<HierarchyId> for HierarchySet {
    fn from_iter<I: IntoIterator<Item = HierarchyId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Key, result type and dependencies of a node.
#[derive(Debug, Clone)]
pub struct CalcHeader {
    pub key: CalcKey,
    pub result_type: ResultType,
    pub dependencies: HierarchySet,
}

#[derive(Serialize)]
struct KeyMaterial<'a, E: Serialize> {
    calc: &'a str,
    result: &'a ResultType,
    children: Vec<&'a str>,
    extra: E,
}

impl CalcHeader {
    /// Build a header whose key hashes the node name, its result type, the
    /// children's keys and any node-specific `extra` data.
    pub fn new(
        calc: &str,
        result_type: ResultType,
        dependencies: HierarchySet,
        children: &[&CalcRef],
        extra: impl Serialize,
    ) -> CompileResult<Self> {
        let material = KeyMaterial {
            calc,
            result: &result_type,
            children: children.iter().map(|c| c.header().key.as_str()).collect(),
            extra,
        };
        let key = CalcKey(key_digest(&material)?.into());
        Ok(Self {
            key,
            result_type,
            dependencies,
        })
    }
}

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    String(String),
    Bool(bool),
    Member(MemberId),
    Tuple(Vec<MemberId>),
    List(TupleList),
    /// Failure captured for one cell.
    Error(EvalError),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Member(_) => "member",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "set",
            Value::Error(_) => "error",
        }
    }

    /// Numeric view: `None` for null, booleans as 1/0.
    pub fn as_number(&self) -> EvalResult<Option<f64>> {
        match self {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(*n)),
            Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
            Value::Error(e) => Err(e.clone()),
            other => Err(EvalError::Type(format!(
                "expected a number, found {}",
                other.type_name()
            ))),
        }
    }

    /// Boolean view: null is false, numbers are true when non-zero.
    pub fn truthy(&self) -> EvalResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => Err(EvalError::Type(format!(
                "expected a boolean, found string '{s}'"
            ))),
            other => Ok(other.as_number()?.is_some_and(|n| n != 0.0)),
        }
    }

    /// Member view; `None` for the null member.
    pub fn as_member(&self) -> EvalResult<Option<MemberId>> {
        match self {
            Value::Member(m) => Ok(Some(*m)),
            Value::Null => Ok(None),
            Value::Error(e) => Err(e.clone()),
            other => Err(EvalError::Type(format!(
                "expected a member, found {}",
                other.type_name()
            ))),
        }
    }

    /// Tuple view; a member is a one-element tuple.
    pub fn into_tuple(self) -> EvalResult<Vec<MemberId>> {
        match self {
            Value::Tuple(t) => Ok(t),
            Value::Member(m) => Ok(vec![m]),
            Value::Error(e) => Err(e),
            other => Err(EvalError::Type(format!(
                "expected a tuple, found {}",
                other.type_name()
            ))),
        }
    }

    pub fn into_list(self) -> EvalResult<TupleList> {
        match self {
            Value::List(l) => Ok(l),
            Value::Error(e) => Err(e),
            other => Err(EvalError::Type(format!(
                "expected a set, found {}",
                other.type_name()
            ))),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map_or(Value::Null, Value::Number)
    }
}
