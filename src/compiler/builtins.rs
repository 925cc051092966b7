//! Built-in functions.

use super::registry::{CompileFn, DefaultArg, FunctionCompiler, FunctionDef, FunctionRegistry};
use super::{CompiledArg, Compiler, ParamType};
use crate::calc::{
    AggregateCalc, AggregateKind, BinaryCalc, BinaryOp, CalcRef, ChildrenCalc, CoalesceEmptyCalc,
    CrossJoinCalc, CurrentMemberCalc, DefaultMemberCalc, DescendantsCalc, FilterCalc,
    HeadTailCalc, HierarchyMembersCalc, IifCalc, LevelMembersCalc, MemberNameCalc, MemberNav,
    MemberNavCalc, NonEmptyCalc, SetLiteralCalc, TupleCalc, UnaryCalc, UnaryOp, UnionCalc,
};
use crate::error::{CompileError, CompileResult};
use crate::query::Syntax;
use crate::schema::HierarchyId;

fn def(name: &str, syntax: Syntax, params: &[ParamType], compile: CompileFn) -> FunctionDef {
    FunctionDef::new(name, syntax, params, compile)
}

pub(super) fn register(r: &mut FunctionRegistry) {
    use ParamType::*;
    use Syntax::{Braces, Function, Infix, Parentheses, Prefix, Property};

    for (name, kind) in [
        ("Sum", AggregateKind::Sum),
        ("Avg", AggregateKind::Avg),
        ("Min", AggregateKind::Min),
        ("Max", AggregateKind::Max),
    ] {
        r.register(
            FunctionDef::new(name, Function, &[Set, Numeric], Aggregate(kind))
                .optional(1, Some(DefaultArg::CurrentMeasure)),
        );
    }
    r.register(def("Count", Function, &[Set, Symbol], count).optional(1, None));
    r.register(def("Count", Property, &[Set], count));

    // sets
    r.register(def("{}", Braces, &[Set], set_literal).variadic(0));
    r.register(def("()", Parentheses, &[Scalar], parenthesized));
    r.register(def("()", Parentheses, &[Member], tuple).variadic(1));
    r.register(def("CrossJoin", Function, &[Set], cross_join).variadic(2));
    r.register(def("*", Infix, &[Set, Set], cross_join));
    r.register(def("Filter", Function, &[Set, Boolean], filter));
    r.register(def("Union", Function, &[Set, Set], union));
    r.register(
        def("Head", Function, &[Set, Numeric], head).optional(1, Some(DefaultArg::Number(1.0))),
    );
    r.register(
        def("Tail", Function, &[Set, Numeric], tail).optional(1, Some(DefaultArg::Number(1.0))),
    );
    r.register(
        def("NonEmpty", Function, &[Set, Numeric], non_empty)
            .optional(1, Some(DefaultArg::CurrentMeasure)),
    );
    r.register(def("Descendants", Function, &[Member, Level], descendants));
    r.register(def("Children", Property, &[Member], children));
    r.register(def("Members", Property, &[Hierarchy], hierarchy_members));
    r.register(def("Members", Property, &[Level], level_members));

    // members
    r.register(def("CurrentMember", Property, &[Hierarchy], current_member));
    r.register(def("DefaultMember", Property, &[Hierarchy], default_member));
    r.register(def("Parent", Property, &[Member], parent));
    r.register(def("PrevMember", Property, &[Member], prev_member));
    r.register(def("NextMember", Property, &[Member], next_member));
    r.register(def("Name", Property, &[Member], name));

    // scalars
    for op in ["+", "-", "*", "/"] {
        r.register(def(op, Infix, &[Numeric, Numeric], binary));
    }
    for op in ["<", "<=", "=", "<>", ">", ">="] {
        r.register(def(op, Infix, &[Scalar, Scalar], binary));
    }
    r.register(def("AND", Infix, &[Boolean, Boolean], binary));
    r.register(def("OR", Infix, &[Boolean, Boolean], binary));
    r.register(def("NOT", Prefix, &[Boolean], not));
    r.register(def("-", Prefix, &[Numeric], negate));
    r.register(def("IIf", Function, &[Boolean, Scalar, Scalar], iif));
    r.register(def("IsEmpty", Function, &[Scalar], is_empty));
    r.register(def("CoalesceEmpty", Function, &[Scalar], coalesce_empty).variadic(2));
}

// =============================================================================
// Argument access
// =============================================================================

fn calc(function: &str, args: &[CompiledArg], index: usize) -> CompileResult<CalcRef> {
    match args.get(index) {
        Some(CompiledArg::Calc(calc)) => Ok(calc.clone()),
        Some(other) => Err(CompileError::ArgumentType {
            function: function.into(),
            index,
            expected: "value".into(),
            found: other.describe(),
        }),
        None => Err(CompileError::Arity {
            function: function.into(),
            expected: format!("at least {}", index + 1),
            found: args.len(),
        }),
    }
}

fn hierarchy(function: &str, args: &[CompiledArg], index: usize) -> CompileResult<HierarchyId> {
    match args.get(index) {
        Some(CompiledArg::Hierarchy(h)) => Ok(*h),
        other => Err(CompileError::ArgumentType {
            function: function.into(),
            index,
            expected: "hierarchy".into(),
            found: other.map_or_else(|| "nothing".into(), CompiledArg::describe),
        }),
    }
}

fn level(function: &str, args: &[CompiledArg], index: usize) -> CompileResult<(HierarchyId, usize)> {
    match args.get(index) {
        Some(CompiledArg::Level { hierarchy, depth }) => Ok((*hierarchy, *depth)),
        other => Err(CompileError::ArgumentType {
            function: function.into(),
            index,
            expected: "level".into(),
            found: other.map_or_else(|| "nothing".into(), CompiledArg::describe),
        }),
    }
}

fn hierarchies_of(calc: &CalcRef) -> Vec<HierarchyId> {
    calc.header().result_type.hierarchies()
}

fn invalid(function: &str, index: usize, reason: impl Into<String>) -> CompileError {
    CompileError::InvalidArgument {
        function: function.into(),
        index,
        reason: reason.into(),
    }
}

// =============================================================================
// Aggregates
// =============================================================================

struct Aggregate(AggregateKind);

impl FunctionCompiler for Aggregate {
    fn compile(
        &self,
        _compiler: &Compiler<'_>,
        function: &str,
        args: Vec<CompiledArg>,
    ) -> CompileResult<CalcRef> {
        AggregateCalc::new(self.0, calc(function, &args, 0)?, calc(function, &args, 1)?)
    }
}

fn count(compiler: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    let set = calc(function, &args, 0)?;
    let exclude_empty = match args.get(1) {
        None => false,
        Some(CompiledArg::Symbol(s)) if s.eq_ignore_ascii_case("EXCLUDEEMPTY") => true,
        Some(CompiledArg::Symbol(s)) if s.eq_ignore_ascii_case("INCLUDEEMPTY") => false,
        Some(other) => {
            let found = match other {
                CompiledArg::Symbol(s) => s.clone(),
                other => other.describe(),
            };
            return Err(invalid(
                function,
                1,
                format!("expected EXCLUDEEMPTY or INCLUDEEMPTY, found {found}"),
            ));
        }
    };
    AggregateCalc::new(
        AggregateKind::Count { exclude_empty },
        set,
        compiler.current_measure_value()?,
    )
}

// =============================================================================
// Sets
// =============================================================================

fn set_literal(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    let items = (0..args.len())
        .map(|i| calc(function, &args, i))
        .collect::<CompileResult<Vec<_>>>()?;
    let hierarchies = items.first().map(hierarchies_of).unwrap_or_default();
    if let Some(index) = items.iter().position(|c| hierarchies_of(c) != hierarchies) {
        return Err(invalid(
            function,
            index,
            "all elements of a set must range over the same hierarchies",
        ));
    }
    SetLiteralCalc::new(items, hierarchies)
}

fn parenthesized(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    calc(function, &args, 0)
}

fn tuple(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    let members = (0..args.len())
        .map(|i| calc(function, &args, i))
        .collect::<CompileResult<Vec<_>>>()?;
    let mut seen = Vec::new();
    for (index, member) in members.iter().enumerate() {
        for h in hierarchies_of(member) {
            if seen.contains(&h) {
                return Err(invalid(function, index, format!("hierarchy {h} appears twice")));
            }
            seen.push(h);
        }
    }
    TupleCalc::new(members)
}

fn cross_join(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    let parts = (0..args.len())
        .map(|i| calc(function, &args, i))
        .collect::<CompileResult<Vec<_>>>()?;
    let mut seen = Vec::new();
    for (index, part) in parts.iter().enumerate() {
        for h in hierarchies_of(part) {
            if seen.contains(&h) {
                return Err(invalid(
                    function,
                    index,
                    format!("hierarchy {h} is already part of the cross join"),
                ));
            }
            seen.push(h);
        }
    }
    CrossJoinCalc::new(parts)
}

fn filter(
    compiler: &Compiler<'_>,
    function: &str,
    args: Vec<CompiledArg>,
) -> CompileResult<CalcRef> {
    FilterCalc::new(
        calc(function, &args, 0)?,
        calc(function, &args, 1)?,
        compiler.cube().hierarchy_ids(),
    )
}

fn union(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    let left = calc(function, &args, 0)?;
    let right = calc(function, &args, 1)?;
    if hierarchies_of(&left) != hierarchies_of(&right) {
        return Err(invalid(
            function,
            1,
            "both sets must range over the same hierarchies",
        ));
    }
    UnionCalc::new(left, right)
}

fn head(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    HeadTailCalc::new(calc(function, &args, 0)?, calc(function, &args, 1)?, false)
}

fn tail(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    HeadTailCalc::new(calc(function, &args, 0)?, calc(function, &args, 1)?, true)
}

fn non_empty(
    compiler: &Compiler<'_>,
    function: &str,
    args: Vec<CompiledArg>,
) -> CompileResult<CalcRef> {
    NonEmptyCalc::new(
        calc(function, &args, 0)?,
        calc(function, &args, 1)?,
        compiler.cube().hierarchy_ids(),
    )
}

fn descendants(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    let member = calc(function, &args, 0)?;
    let (level_hierarchy, depth) = level(function, &args, 1)?;
    if hierarchies_of(&member) != [level_hierarchy] {
        return Err(invalid(
            function,
            1,
            "level belongs to a different hierarchy than the member",
        ));
    }
    DescendantsCalc::new(member, depth)
}

fn children(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    ChildrenCalc::new(calc(function, &args, 0)?)
}

fn hierarchy_members(
    _: &Compiler<'_>,
    function: &str,
    args: Vec<CompiledArg>,
) -> CompileResult<CalcRef> {
    HierarchyMembersCalc::new(hierarchy(function, &args, 0)?)
}

fn level_members(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    let (h, depth) = level(function, &args, 0)?;
    LevelMembersCalc::new(h, depth)
}

// =============================================================================
// Members
// =============================================================================

fn current_member(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    CurrentMemberCalc::new(hierarchy(function, &args, 0)?)
}

fn default_member(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    DefaultMemberCalc::new(hierarchy(function, &args, 0)?)
}

fn parent(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    MemberNavCalc::new(MemberNav::Parent, calc(function, &args, 0)?)
}

fn prev_member(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    MemberNavCalc::new(MemberNav::PrevMember, calc(function, &args, 0)?)
}

fn next_member(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    MemberNavCalc::new(MemberNav::NextMember, calc(function, &args, 0)?)
}

fn name(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    MemberNameCalc::new(calc(function, &args, 0)?)
}

// =============================================================================
// Scalars
// =============================================================================

fn binary(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    let op = BinaryOp::from_symbol(function).ok_or_else(|| CompileError::UnknownFunction {
        name: function.into(),
        syntax: Syntax::Infix.to_string(),
    })?;
    BinaryCalc::new(op, calc(function, &args, 0)?, calc(function, &args, 1)?)
}

fn negate(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    UnaryCalc::new(UnaryOp::Negate, calc(function, &args, 0)?)
}

fn not(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    UnaryCalc::new(UnaryOp::Not, calc(function, &args, 0)?)
}

fn is_empty(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    UnaryCalc::new(UnaryOp::IsEmpty, calc(function, &args, 0)?)
}

fn iif(_: &Compiler<'_>, function: &str, args: Vec<CompiledArg>) -> CompileResult<CalcRef> {
    IifCalc::new(
        calc(function, &args, 0)?,
        calc(function, &args, 1)?,
        calc(function, &args, 2)?,
    )
}

fn coalesce_empty(
    _: &Compiler<'_>,
    function: &str,
    args: Vec<CompiledArg>,
) -> CompileResult<CalcRef> {
    let operands = (0..args.len())
        .map(|i| calc(function, &args, i))
        .collect::<CompileResult<Vec<_>>>()?;
    CoalesceEmptyCalc::new(operands)
}
