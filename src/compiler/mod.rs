//! Expression compiler.
//!
//! Turns a resolved [`Exp`] tree into a tree of [`Calc`] nodes. Function
//! calls are looked up in a [`FunctionRegistry`] by name and syntax; when a
//! name has several overloads, the one needing the cheapest implicit
//! conversions of its arguments wins:
//!
//! | From      | To        | Cost | Conversion                    |
//! |-----------|-----------|------|-------------------------------|
//! | numeric   | boolean   | 1    | non-zero is true              |
//! | member    | tuple/set | 1    | one-element tuple/set         |
//! | member    | scalar    | 2    | value at the member           |
//! | tuple     | set       | 1    | one-element set               |
//! | tuple     | scalar    | 2    | value at the tuple            |
//! | hierarchy | member    | 1    | `h.CurrentMember`             |
//! | hierarchy | tuple     | 2    | `(h.CurrentMember)`           |
//! | hierarchy | set       | 2    | `h.Members`                   |
//! | hierarchy | scalar    | 3    | value at `h.CurrentMember`    |
//! | level     | set       | 1    | `l.Members`                   |

mod builtins;
mod registry;

pub use registry::{CompileFn, DefaultArg, FunctionCompiler, FunctionDef, FunctionRegistry, ParamType};

use std::collections::HashMap;

use tracing::trace;

use crate::calc::{
    Calc, CalcRef, ConstantCalc, ConstantMemberCalc, CurrentMeasureValueCalc, CurrentMemberCalc,
    HierarchyMembersCalc, LevelMembersCalc, MemberValueCalc, NonEmptyCalc, ResultType,
    SetLiteralCalc, TupleCalc, TupleValueCalc, Value,
};
use crate::error::{CompileError, CompileResult};
use crate::query::{Exp, Syntax};
use crate::schema::{Cube, HierarchyId, MemberId};

/// Shape the caller expects from a compiled expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultStyle {
    #[default]
    Any,
    Scalar,
    Member,
    Tuple,
    List,
}

/// What the caller wants back from [`Compiler::compile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileHint {
    pub style: ResultStyle,
    /// Wrap a set so that tuples with an empty current-measure value are
    /// dropped.
    pub non_empty: bool,
}

impl CompileHint {
    pub fn scalar() -> Self {
        Self {
            style: ResultStyle::Scalar,
            non_empty: false,
        }
    }

    pub fn list() -> Self {
        Self {
            style: ResultStyle::List,
            non_empty: false,
        }
    }

    pub fn non_empty_list() -> Self {
        Self {
            style: ResultStyle::List,
            non_empty: true,
        }
    }
}

/// A compiled argument, before conversion to its parameter's category.
#[derive(Debug, Clone)]
pub enum CompiledArg {
    Calc(CalcRef),
    Hierarchy(HierarchyId),
    Level { hierarchy: HierarchyId, depth: usize },
    Symbol(String),
}

impl CompiledArg {
    /// Human-readable category, for error messages.
    pub fn describe(&self) -> String {
        match self {
            CompiledArg::Calc(calc) => calc.header().result_type.to_string(),
            CompiledArg::Hierarchy(_) => "hierarchy".into(),
            CompiledArg::Level { .. } => "level".into(),
            CompiledArg::Symbol(_) => "symbol".into(),
        }
    }

    pub fn as_calc(&self) -> Option<&CalcRef> {
        match self {
            CompiledArg::Calc(calc) => Some(calc),
            _ => None,
        }
    }
}

/// Compiles expressions against one cube.
pub struct Compiler<'a> {
    cube: &'a Cube,
    registry: &'a FunctionRegistry,
}

impl<'a> Compiler<'a> {
    pub fn new(cube: &'a Cube, registry: &'a FunctionRegistry) -> Self {
        Self { cube, registry }
    }

    pub fn cube(&self) -> &'a Cube {
        self.cube
    }

    /// Compile `exp` into a node of the shape `hint` asks for.
    pub fn compile(&self, exp: &Exp, hint: CompileHint) -> CompileResult<CalcRef> {
        let arg = self.compile_arg(exp)?;
        let target = match hint.style {
            ResultStyle::Any => match arg {
                CompiledArg::Calc(calc) => return Ok(calc),
                CompiledArg::Level { .. } => ParamType::Set,
                _ => ParamType::Member,
            },
            ResultStyle::Scalar => ParamType::Scalar,
            ResultStyle::Member => ParamType::Member,
            ResultStyle::Tuple => ParamType::Tuple,
            ResultStyle::List => ParamType::Set,
        };
        if conversion_cost(&arg, target).is_none() {
            return Err(CompileError::ResultType {
                expected: target.to_string(),
                found: arg.describe(),
            });
        }
        let CompiledArg::Calc(calc) = self.convert(arg, target)? else {
            return Err(CompileError::ResultType {
                expected: target.to_string(),
                found: "non-value".into(),
            });
        };
        if hint.non_empty && matches!(calc.header().result_type, ResultType::List(_)) {
            return NonEmptyCalc::new(
                calc,
                self.current_measure_value()?,
                self.cube.hierarchy_ids(),
            );
        }
        Ok(calc)
    }

    pub fn compile_scalar(&self, exp: &Exp) -> CompileResult<CalcRef> {
        self.compile(exp, CompileHint::scalar())
    }

    pub fn compile_list(&self, exp: &Exp) -> CompileResult<CalcRef> {
        self.compile(exp, CompileHint::list())
    }

    /// The value of whichever measure is current.
    pub fn current_measure_value(&self) -> CompileResult<CalcRef> {
        CurrentMeasureValueCalc::new(self.cube.hierarchy_ids())
    }

    fn compile_arg(&self, exp: &Exp) -> CompileResult<CompiledArg> {
        let calc = match exp {
            Exp::Number { value } => ConstantCalc::number(*value)?,
            Exp::String { value } => ConstantCalc::new(Value::String(value.clone()))?,
            Exp::Bool { value } => ConstantCalc::new(Value::Bool(*value))?,
            Exp::Null => ConstantCalc::new(Value::Null)?,
            Exp::Member { id } => {
                if self.cube.member(*id).is_none() {
                    return Err(CompileError::InvalidMember(id.to_string()));
                }
                ConstantMemberCalc::new(*id)?
            }
            Exp::Hierarchy { id } => {
                if self.cube.hierarchies().get(id.index()).is_none() {
                    return Err(CompileError::InvalidMember(format!("hierarchy {id}")));
                }
                return Ok(CompiledArg::Hierarchy(*id));
            }
            Exp::Level { hierarchy, depth } => {
                let exists = self
                    .cube
                    .hierarchies()
                    .get(hierarchy.index())
                    .is_some_and(|h| h.level(*depth).is_some());
                if !exists {
                    return Err(CompileError::InvalidMember(format!(
                        "level {depth} of hierarchy {hierarchy}"
                    )));
                }
                return Ok(CompiledArg::Level {
                    hierarchy: *hierarchy,
                    depth: *depth,
                });
            }
            Exp::Symbol { name } => return Ok(CompiledArg::Symbol(name.clone())),
            Exp::Call { name, syntax, args } => self.compile_call(name, *syntax, args)?,
        };
        Ok(CompiledArg::Calc(calc))
    }

    fn compile_call(&self, name: &str, syntax: Syntax, args: &[Exp]) -> CompileResult<CalcRef> {
        let candidates = self.registry.lookup(name, syntax);
        if candidates.is_empty() {
            return Err(CompileError::UnknownFunction {
                name: name.into(),
                syntax: syntax.to_string(),
            });
        }

        let compiled = args
            .iter()
            .map(|arg| self.compile_arg(arg))
            .collect::<CompileResult<Vec<_>>>()?;

        let mut best: Option<(u32, &FunctionDef)> = None;
        let mut mismatch = None;
        for def in candidates.iter().filter(|d| d.accepts_count(compiled.len())) {
            let mut total = 0;
            let mut failed = None;
            for (index, arg) in compiled.iter().enumerate() {
                let Some(param) = def.param(index) else {
                    failed = Some((index, "nothing".to_string()));
                    break;
                };
                match conversion_cost(arg, param) {
                    Some(cost) => total += cost,
                    None => {
                        failed = Some((index, param.to_string()));
                        break;
                    }
                }
            }
            match failed {
                None => {
                    if best.map_or(true, |(cost, _)| total < cost) {
                        best = Some((total, def));
                    }
                }
                Some((index, expected)) => {
                    mismatch.get_or_insert(CompileError::ArgumentType {
                        function: def.name.clone(),
                        index,
                        expected,
                        found: compiled[index].describe(),
                    });
                }
            }
        }

        let Some((cost, def)) = best else {
            return Err(mismatch.unwrap_or_else(|| {
                let mut arities: Vec<String> = candidates.iter().map(FunctionDef::arity).collect();
                arities.dedup();
                CompileError::Arity {
                    function: candidates[0].name.clone(),
                    expected: arities.join(" or "),
                    found: compiled.len(),
                }
            }));
        };
        trace!(signature = %def.signature(), cost, "resolved overload");

        let mut converted = Vec::with_capacity(def.params.len().max(compiled.len()));
        for (index, arg) in compiled.into_iter().enumerate() {
            match def.param(index) {
                Some(param) => converted.push(self.convert(arg, param)?),
                None => converted.push(arg),
            }
        }
        if converted.len() < def.params.len() {
            match def.default {
                Some(DefaultArg::CurrentMeasure) => {
                    converted.push(CompiledArg::Calc(self.current_measure_value()?))
                }
                Some(DefaultArg::Number(n)) => {
                    converted.push(CompiledArg::Calc(ConstantCalc::number(n)?))
                }
                None => {}
            }
        }
        def.compiler.compile(self, &def.name, converted)
    }

    /// Apply the implicit conversion from `arg` to `param`.
    fn convert(&self, arg: CompiledArg, param: ParamType) -> CompileResult<CompiledArg> {
        let calc = match (arg, param) {
            (CompiledArg::Hierarchy(h), ParamType::Member) => CurrentMemberCalc::new(h)?,
            (CompiledArg::Hierarchy(h), ParamType::Tuple) => {
                TupleCalc::new(vec![CurrentMemberCalc::new(h)?])?
            }
            (CompiledArg::Hierarchy(h), ParamType::Set) => HierarchyMembersCalc::new(h)?,
            (CompiledArg::Hierarchy(h), p) if p.is_scalar() => {
                MemberValueCalc::new(CurrentMemberCalc::new(h)?)?
            }
            (CompiledArg::Level { hierarchy, depth }, ParamType::Set) => {
                LevelMembersCalc::new(hierarchy, depth)?
            }
            (CompiledArg::Calc(calc), param) => convert_calc(calc, param)?,
            (other, _) => return Ok(other),
        };
        Ok(CompiledArg::Calc(calc))
    }
}

fn convert_calc(calc: CalcRef, param: ParamType) -> CompileResult<CalcRef> {
    let result_type = calc.header().result_type.clone();
    match (result_type, param) {
        (ResultType::Member(_), ParamType::Tuple) => TupleCalc::new(vec![calc]),
        (ResultType::Member(h), ParamType::Set) => SetLiteralCalc::new(vec![calc], vec![h]),
        (ResultType::Member(_), p) if p.is_scalar() => MemberValueCalc::new(calc),
        (ResultType::Tuple(hs), ParamType::Set) => SetLiteralCalc::new(vec![calc], hs),
        (ResultType::Tuple(_), p) if p.is_scalar() => TupleValueCalc::new(calc),
        _ => Ok(calc),
    }
}

/// Cost of passing `arg` where `param` is declared, or `None` when no
/// implicit conversion exists.
fn conversion_cost(arg: &CompiledArg, param: ParamType) -> Option<u32> {
    use ParamType as P;
    match arg {
        CompiledArg::Hierarchy(_) => match param {
            P::Hierarchy => Some(0),
            P::Member => Some(1),
            P::Tuple | P::Set => Some(2),
            p if p.is_scalar() => Some(3),
            _ => None,
        },
        CompiledArg::Level { .. } => match param {
            P::Level => Some(0),
            P::Set => Some(1),
            _ => None,
        },
        CompiledArg::Symbol(_) => (param == P::Symbol).then_some(0),
        CompiledArg::Calc(calc) => match (&calc.header().result_type, param) {
            (ResultType::Member(_), P::Member) => Some(0),
            (ResultType::Member(_), P::Tuple | P::Set) => Some(1),
            (ResultType::Member(_), p) if p.is_scalar() => Some(2),
            (ResultType::Tuple(_), P::Tuple) => Some(0),
            (ResultType::Tuple(_), P::Set) => Some(1),
            (ResultType::Tuple(_), p) if p.is_scalar() => Some(2),
            (ResultType::List(_), P::Set) => Some(0),
            (ResultType::Numeric, P::Numeric | P::Scalar) => Some(0),
            (ResultType::Numeric, P::Boolean) => Some(1),
            (ResultType::String, P::String | P::Scalar) => Some(0),
            (ResultType::Boolean, P::Boolean | P::Scalar) => Some(0),
            (ResultType::Boolean, P::Numeric) => Some(1),
            (ResultType::Scalar, p) if p.is_scalar() => Some(0),
            _ => None,
        },
    }
}

/// Compile every calculated member of `cube` as a scalar.
pub fn compile_calculated_members(
    cube: &Cube,
    registry: &FunctionRegistry,
) -> CompileResult<HashMap<MemberId, CalcRef>> {
    let compiler = Compiler::new(cube, registry);
    cube.calculated_members()
        .map(|(id, exp)| -> CompileResult<_> { Ok((id, compiler.compile_scalar(exp)?)) })
        .collect()
}
