//! Set expressions.

use std::collections::HashSet;
use std::sync::Arc;

use super::{Calc, CalcHeader, CalcRef, HierarchySet, ResultType, TupleList, Value};
use crate::error::{CompileResult, EvalError, EvalResult};
use crate::eval::Evaluator;
use crate::schema::{HierarchyId, MemberId};

/// Dependencies of a node that iterates `set` and evaluates `inner` at each
/// tuple: the set's hierarchies are pinned by the iteration.
pub(super) fn iteration_dependencies(set: &CalcRef, inner: &CalcRef) -> HierarchySet {
    let pinned = set.header().result_type.hierarchies();
    set.header()
        .dependencies
        .union(&inner.header().dependencies.without(&pinned))
}

/// Dependencies of a node that keeps or drops tuples of `set` by reading
/// cells at each tuple. Cells read there are coordinated by every hierarchy
/// of `context` the set does not pin, whatever `inner` itself names.
fn predicate_dependencies(
    set: &CalcRef,
    inner: &CalcRef,
    context: impl IntoIterator<Item = HierarchyId>,
) -> HierarchySet {
    let pinned = set.header().result_type.hierarchies();
    let context: HierarchySet = context.into_iter().collect();
    iteration_dependencies(set, inner).union(&context.without(&pinned))
}

fn list_of(value: Value) -> EvalResult<TupleList> {
    match value {
        Value::Member(m) => Ok(TupleList::from_members([m])),
        Value::Tuple(t) => Ok(TupleList::from_tuples(vec![t])),
        Value::Null => Ok(TupleList::empty()),
        other => other.into_list(),
    }
}

fn member_of(value: Value) -> EvalResult<Option<MemberId>> {
    value.as_member()
}

// =============================================================================
// Constructors
// =============================================================================

/// `{a, b, ...}`: concatenation, duplicates kept.
#[derive(Debug)]
pub struct SetLiteralCalc {
    header: CalcHeader,
    items: Vec<CalcRef>,
}

impl SetLiteralCalc {
    pub fn new(items: Vec<CalcRef>, hierarchies: Vec<HierarchyId>) -> CompileResult<CalcRef> {
        let children: Vec<&CalcRef> = items.iter().collect();
        let header = CalcHeader::new(
            "SetLiteral",
            ResultType::List(hierarchies),
            HierarchySet::of_all(items.iter()),
            &children,
            (),
        )?;
        Ok(Arc::new(Self { header, items }))
    }
}

impl Calc for SetLiteralCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        if let [single] = self.items.as_slice() {
            return Ok(Value::List(list_of(evaluator.evaluate(single.as_ref())?)?));
        }
        let mut tuples = Vec::new();
        for item in &self.items {
            tuples.extend(list_of(evaluator.evaluate(item.as_ref())?)?.iter());
        }
        Ok(Value::List(TupleList::from_tuples(tuples)))
    }
}

/// `member.Children`
#[derive(Debug)]
pub struct ChildrenCalc {
    header: CalcHeader,
    member: CalcRef,
}

impl ChildrenCalc {
    pub fn new(member: CalcRef) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "Children",
            ResultType::List(member.header().result_type.hierarchies()),
            member.header().dependencies.clone(),
            &[&member],
            (),
        )?;
        Ok(Arc::new(Self { header, member }))
    }
}

impl Calc for ChildrenCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let Some(id) = member_of(evaluator.evaluate(self.member.as_ref())?)? else {
            return Ok(Value::List(TupleList::empty()));
        };
        let children = evaluator
            .cube()
            .member(id)
            .map(|m| m.children.clone())
            .unwrap_or_default();
        Ok(Value::List(TupleList::from_members(children)))
    }
}

/// `Hierarchy.Members`, in hierarchical order.
#[derive(Debug)]
pub struct HierarchyMembersCalc {
    header: CalcHeader,
    hierarchy: HierarchyId,
}

impl HierarchyMembersCalc {
    pub fn new(hierarchy: HierarchyId) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "HierarchyMembers",
            ResultType::List(vec![hierarchy]),
            HierarchySet::new(),
            &[],
            hierarchy,
        )?;
        Ok(Arc::new(Self { header, hierarchy }))
    }
}

impl Calc for HierarchyMembersCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let members = evaluator.cube().hierarchy(self.hierarchy).members();
        Ok(Value::List(TupleList::from_members(members)))
    }
}

/// `Level.Members`
#[derive(Debug)]
pub struct LevelMembersCalc {
    header: CalcHeader,
    hierarchy: HierarchyId,
    depth: usize,
}

impl LevelMembersCalc {
    pub fn new(hierarchy: HierarchyId, depth: usize) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "LevelMembers",
            ResultType::List(vec![hierarchy]),
            HierarchySet::new(),
            &[],
            (hierarchy, depth),
        )?;
        Ok(Arc::new(Self {
            header,
            hierarchy,
            depth,
        }))
    }
}

impl Calc for LevelMembersCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let members = evaluator.cube().hierarchy(self.hierarchy).members_at(self.depth);
        Ok(Value::List(TupleList::from_members(members)))
    }
}

/// `Descendants(member, level)`
#[derive(Debug)]
pub struct DescendantsCalc {
    header: CalcHeader,
    member: CalcRef,
    depth: usize,
}

impl DescendantsCalc {
    pub fn new(member: CalcRef, depth: usize) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "Descendants",
            ResultType::List(member.header().result_type.hierarchies()),
            member.header().dependencies.clone(),
            &[&member],
            depth,
        )?;
        Ok(Arc::new(Self {
            header,
            member,
            depth,
        }))
    }
}

impl Calc for DescendantsCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let Some(id) = member_of(evaluator.evaluate(self.member.as_ref())?)? else {
            return Ok(Value::List(TupleList::empty()));
        };
        let members = evaluator
            .cube()
            .hierarchy(id.hierarchy)
            .descendants_at(id, self.depth);
        Ok(Value::List(TupleList::from_members(members)))
    }
}

/// `CrossJoin(a, b)` and `a * b`; stays lazy.
#[derive(Debug)]
pub struct CrossJoinCalc {
    header: CalcHeader,
    parts: Vec<CalcRef>,
}

impl CrossJoinCalc {
    pub fn new(parts: Vec<CalcRef>) -> CompileResult<CalcRef> {
        let hierarchies = parts
            .iter()
            .flat_map(|p| p.header().result_type.hierarchies())
            .collect();
        let children: Vec<&CalcRef> = parts.iter().collect();
        let header = CalcHeader::new(
            "CrossJoin",
            ResultType::List(hierarchies),
            HierarchySet::of_all(parts.iter()),
            &children,
            (),
        )?;
        Ok(Arc::new(Self { header, parts }))
    }
}

impl Calc for CrossJoinCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let mut lists = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            lists.push(list_of(evaluator.evaluate(part.as_ref())?)?);
        }
        Ok(Value::List(TupleList::cross_join(lists)))
    }
}

// =============================================================================
// Filters
// =============================================================================

/// `Filter(set, condition)`
#[derive(Debug)]
pub struct FilterCalc {
    header: CalcHeader,
    set: CalcRef,
    condition: CalcRef,
}

impl FilterCalc {
    /// `context` lists the hierarchies of the cube the condition is read in.
    pub fn new(
        set: CalcRef,
        condition: CalcRef,
        context: impl IntoIterator<Item = HierarchyId>,
    ) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "Filter",
            set.header().result_type.clone(),
            predicate_dependencies(&set, &condition, context),
            &[&set, &condition],
            (),
        )?;
        Ok(Arc::new(Self {
            header,
            set,
            condition,
        }))
    }
}

impl Calc for FilterCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let list = list_of(evaluator.evaluate(self.set.as_ref())?)?;
        let mut kept = Vec::new();
        for tuple in list.iter() {
            let keep = evaluator
                .evaluate_at(&tuple, self.condition.as_ref())?
                .truthy()?;
            if keep {
                kept.push(tuple);
            }
        }
        Ok(Value::List(TupleList::from_tuples(kept)))
    }

    fn is_cacheable(&self) -> bool {
        true
    }
}

/// `NonEmpty(set[, value])`: tuples where `value` is not null.
///
/// Candidates are walked one at a time, so a lazy cross join is never
/// expanded beyond the tuples that survive.
#[derive(Debug)]
pub struct NonEmptyCalc {
    header: CalcHeader,
    set: CalcRef,
    value: CalcRef,
}

impl NonEmptyCalc {
    pub fn new(
        set: CalcRef,
        value: CalcRef,
        context: impl IntoIterator<Item = HierarchyId>,
    ) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "NonEmpty",
            set.header().result_type.clone(),
            predicate_dependencies(&set, &value, context),
            &[&set, &value],
            (),
        )?;
        Ok(Arc::new(Self { header, set, value }))
    }
}

impl Calc for NonEmptyCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let list = list_of(evaluator.evaluate(self.set.as_ref())?)?;
        let mut kept = Vec::new();
        for tuple in list.iter() {
            if !evaluator.evaluate_at(&tuple, self.value.as_ref())?.is_null() {
                kept.push(tuple);
            }
        }
        Ok(Value::List(TupleList::from_tuples(kept)))
    }

    fn is_cacheable(&self) -> bool {
        true
    }
}

// =============================================================================
// Combinators
// =============================================================================

/// `Union(a, b)`: distinct tuples, first occurrence wins.
#[derive(Debug)]
pub struct UnionCalc {
    header: CalcHeader,
    left: CalcRef,
    right: CalcRef,
}

impl UnionCalc {
    pub fn new(left: CalcRef, right: CalcRef) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "Union",
            left.header().result_type.clone(),
            HierarchySet::of_all([&left, &right]),
            &[&left, &right],
            (),
        )?;
        Ok(Arc::new(Self {
            header,
            left,
            right,
        }))
    }
}

impl Calc for UnionCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let left = list_of(evaluator.evaluate(self.left.as_ref())?)?;
        let right = list_of(evaluator.evaluate(self.right.as_ref())?)?;
        let mut seen = HashSet::new();
        let tuples = left
            .iter()
            .chain(right.iter())
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Ok(Value::List(TupleList::from_tuples(tuples)))
    }
}

/// `Head(set, n)` / `Tail(set, n)`
#[derive(Debug)]
pub struct HeadTailCalc {
    header: CalcHeader,
    set: CalcRef,
    count: CalcRef,
    tail: bool,
}

impl HeadTailCalc {
    pub fn new(set: CalcRef, count: CalcRef, tail: bool) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            if tail { "Tail" } else { "Head" },
            set.header().result_type.clone(),
            HierarchySet::of_all([&set, &count]),
            &[&set, &count],
            (),
        )?;
        Ok(Arc::new(Self {
            header,
            set,
            count,
            tail,
        }))
    }
}

impl Calc for HeadTailCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let list = list_of(evaluator.evaluate(self.set.as_ref())?)?;
        let n = evaluator
            .evaluate(self.count.as_ref())?
            .as_number()?
            .ok_or_else(|| EvalError::Type("Head/Tail count is null".into()))?;
        let n = if n.is_sign_negative() { 0 } else { n as usize }.min(list.len());
        let start = if self.tail { list.len() - n } else { 0 };
        let tuples = (start..start + n).filter_map(|i| list.get(i)).collect();
        Ok(Value::List(TupleList::from_tuples(tuples)))
    }
}
