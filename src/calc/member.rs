//! Member and tuple expressions.

use std::sync::Arc;

use serde::Serialize;

use super::{Calc, CalcHeader, CalcRef, HierarchySet, ResultType, Value};
use crate::error::{CompileResult, EvalError, EvalResult};
use crate::eval::Evaluator;
use crate::schema::{HierarchyId, MemberId};

/// A fixed member.
#[derive(Debug)]
pub struct ConstantMemberCalc {
    header: CalcHeader,
    member: MemberId,
}

impl ConstantMemberCalc {
    pub fn new(member: MemberId) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "ConstantMember",
            ResultType::Member(member.hierarchy),
            HierarchySet::new(),
            &[],
            member,
        )?;
        Ok(Arc::new(Self { header, member }))
    }
}

impl Calc for ConstantMemberCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, _evaluator: &mut Evaluator) -> EvalResult<Value> {
        Ok(Value::Member(self.member))
    }
}

/// `Hierarchy.CurrentMember`
#[derive(Debug)]
pub struct CurrentMemberCalc {
    header: CalcHeader,
    hierarchy: HierarchyId,
}

impl CurrentMemberCalc {
    pub fn new(hierarchy: HierarchyId) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "CurrentMember",
            ResultType::Member(hierarchy),
            HierarchySet::single(hierarchy),
            &[],
            hierarchy,
        )?;
        Ok(Arc::new(Self { header, hierarchy }))
    }
}

impl Calc for CurrentMemberCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        Ok(Value::Member(evaluator.context().member(self.hierarchy)))
    }
}

/// `Hierarchy.DefaultMember`
#[derive(Debug)]
pub struct DefaultMemberCalc {
    header: CalcHeader,
    hierarchy: HierarchyId,
}

impl DefaultMemberCalc {
    pub fn new(hierarchy: HierarchyId) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "DefaultMember",
            ResultType::Member(hierarchy),
            HierarchySet::new(),
            &[],
            hierarchy,
        )?;
        Ok(Arc::new(Self { header, hierarchy }))
    }
}

impl Calc for DefaultMemberCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        Ok(evaluator
            .cube()
            .hierarchy(self.hierarchy)
            .default_member()
            .map_or(Value::Null, Value::Member))
    }
}

/// Navigation from a member to a relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemberNav {
    Parent,
    PrevMember,
    NextMember,
}

/// `member.Parent`, `member.PrevMember`, `member.NextMember`
///
/// Yields the null member when there is no such relative.
#[derive(Debug)]
pub struct MemberNavCalc {
    header: CalcHeader,
    nav: MemberNav,
    member: CalcRef,
}

impl MemberNavCalc {
    pub fn new(nav: MemberNav, member: CalcRef) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "MemberNav",
            member.header().result_type.clone(),
            member.header().dependencies.clone(),
            &[&member],
            nav,
        )?;
        Ok(Arc::new(Self {
            header,
            nav,
            member,
        }))
    }
}

impl Calc for MemberNavCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let Some(id) = evaluator.evaluate(self.member.as_ref())?.as_member()? else {
            return Ok(Value::Null);
        };
        let cube = evaluator.cube();
        let Some(member) = cube.member(id) else {
            return Err(EvalError::Type(format!("unknown member {id}")));
        };
        let related = match self.nav {
            MemberNav::Parent => member.parent,
            MemberNav::PrevMember | MemberNav::NextMember => {
                let level = cube.hierarchy(id.hierarchy).members_at(member.depth);
                level.iter().position(|m| *m == id).and_then(|pos| {
                    if self.nav == MemberNav::PrevMember {
                        pos.checked_sub(1).and_then(|p| level.get(p).copied())
                    } else {
                        level.get(pos + 1).copied()
                    }
                })
            }
        };
        Ok(related.map_or(Value::Null, Value::Member))
    }
}

/// `member.Name`
#[derive(Debug)]
pub struct MemberNameCalc {
    header: CalcHeader,
    member: CalcRef,
}

impl MemberNameCalc {
    pub fn new(member: CalcRef) -> CompileResult<CalcRef> {
        let header = CalcHeader::new(
            "MemberName",
            ResultType::String,
            member.header().dependencies.clone(),
            &[&member],
            (),
        )?;
        Ok(Arc::new(Self { header, member }))
    }
}

impl Calc for MemberNameCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let Some(id) = evaluator.evaluate(self.member.as_ref())?.as_member()? else {
            return Ok(Value::Null);
        };
        Ok(evaluator
            .cube()
            .member(id)
            .map_or(Value::Null, |m| Value::String(m.name.clone())))
    }
}

/// `(m1, m2, ...)`: one member per hierarchy.
#[derive(Debug)]
pub struct TupleCalc {
    header: CalcHeader,
    members: Vec<CalcRef>,
}

impl TupleCalc {
    pub fn new(members: Vec<CalcRef>) -> CompileResult<CalcRef> {
        let hierarchies = members
            .iter()
            .flat_map(|m| m.header().result_type.hierarchies())
            .collect();
        let children: Vec<&CalcRef> = members.iter().collect();
        let header = CalcHeader::new(
            "Tuple",
            ResultType::Tuple(hierarchies),
            HierarchySet::of_all(members.iter()),
            &children,
            (),
        )?;
        Ok(Arc::new(Self { header, members }))
    }
}

impl Calc for TupleCalc {
    fn header(&self) -> &CalcHeader {
        &self.header
    }

    fn evaluate(&self, evaluator: &mut Evaluator) -> EvalResult<Value> {
        let mut tuple = Vec::with_capacity(self.members.len());
        for member in &self.members {
            match evaluator.evaluate(member.as_ref())? {
                Value::Member(m) => tuple.push(m),
                Value::Tuple(t) => tuple.extend(t),
                // a null member makes the whole tuple null
                Value::Null => return Ok(Value::Null),
                other => {
                    return Err(EvalError::Type(format!(
                        "tuple element is a {}",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(Value::Tuple(tuple))
    }
}
