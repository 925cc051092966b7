//! Overload resolution, argument validation and built-in semantics of the
//! expression compiler.

#[path = "../common/mod.rs"]
mod common;

use common::{sales_cube, MemoryReader, SalesCube};
use rolap::calc::{
    AggregateCalc, AggregateKind, Calc, CalcRef, ConstantCalc, HierarchySet, ResultType,
    TupleList, Value,
};
use rolap::compiler::{
    compile_calculated_members, CompileFn, CompileHint, CompiledArg, Compiler, FunctionDef,
    FunctionRegistry, ParamType,
};
use rolap::config::EngineSettings;
use rolap::error::{CompileError, CompileResult};
use rolap::eval::Evaluator;
use rolap::query::{Exp, Syntax};
use rolap::schema::{HierarchyId, MemberId};

fn compile(fx: &SalesCube, exp: &Exp) -> CompileResult<CalcRef> {
    let registry = FunctionRegistry::builtin();
    Compiler::new(&fx.cube, &registry).compile(exp, CompileHint::default())
}

fn compile_err(fx: &SalesCube, exp: &Exp) -> CompileError {
    compile(fx, exp).unwrap_err()
}

fn evaluate(fx: &SalesCube, exp: &Exp) -> Value {
    let calc = compile(fx, exp).unwrap();
    let (reader, _) = MemoryReader::new();
    let mut ev = Evaluator::new(fx.cube.clone(), Box::new(reader), &EngineSettings::default());
    ev.evaluate(calc.as_ref()).unwrap()
}

fn members_of(h: HierarchyId) -> Exp {
    Exp::property(Exp::hierarchy(h), "Members")
}

fn year_members(fx: &SalesCube) -> Exp {
    Exp::property(Exp::level(fx.time, 1), "Members")
}

fn state_members(fx: &SalesCube) -> Exp {
    Exp::property(Exp::level(fx.store, 1), "Members")
}

// =============================================================================
// Overload resolution
// =============================================================================

#[test]
fn test_parenthesized_member_becomes_tuple() {
    let fx = sales_cube();
    let calc = compile(&fx, &Exp::tuple(vec![Exp::member(fx.y1997)])).unwrap();
    assert_eq!(calc.header().result_type, ResultType::Tuple(vec![fx.time]));
}

#[test]
fn test_parenthesized_scalar_passes_through() {
    let fx = sales_cube();
    let calc = compile(
        &fx,
        &Exp::tuple(vec![Exp::infix("+", Exp::number(1.0), Exp::number(2.0))]),
    )
    .unwrap();
    assert_eq!(calc.header().result_type, ResultType::Numeric);
}

#[test]
fn test_members_property_resolves_hierarchy_and_level_overloads() {
    let fx = sales_cube();
    let all = evaluate(&fx, &members_of(fx.time));
    let years = evaluate(&fx, &year_members(&fx));

    // All, 1997, Q1, Q2, 1998, Q1, Q2
    assert!(matches!(all, Value::List(ref l) if l.len() == 7));
    assert_eq!(
        years,
        Value::List(TupleList::from_members([fx.y1997, fx.y1998]))
    );
}

#[test]
fn test_function_names_are_case_insensitive() {
    let fx = sales_cube();
    let value = evaluate(
        &fx,
        &Exp::call("sUm", vec![year_members(&fx), Exp::member(fx.units)]),
    );
    assert_eq!(value, Value::Number(36.0));
}

#[test]
fn test_earlier_registration_wins_a_tie() {
    fn first(_: &Compiler<'_>, _: &str, _: Vec<CompiledArg>) -> CompileResult<CalcRef> {
        ConstantCalc::number(1.0)
    }
    fn second(_: &Compiler<'_>, _: &str, _: Vec<CompiledArg>) -> CompileResult<CalcRef> {
        ConstantCalc::number(2.0)
    }

    let fx = sales_cube();
    let mut registry = FunctionRegistry::builtin();
    let before = registry.len();
    registry.register(FunctionDef::new(
        "Pick",
        Syntax::Function,
        &[ParamType::Numeric],
        first as CompileFn,
    ));
    registry.register(FunctionDef::new(
        "Pick",
        Syntax::Function,
        &[ParamType::Numeric],
        second as CompileFn,
    ));
    assert_eq!(registry.len(), before + 2);

    let calc = Compiler::new(&fx.cube, &registry)
        .compile_scalar(&Exp::call("Pick", vec![Exp::number(7.0)]))
        .unwrap();
    let (reader, _) = MemoryReader::new();
    let mut ev = Evaluator::new(fx.cube.clone(), Box::new(reader), &EngineSettings::default());
    assert_eq!(ev.evaluate(calc.as_ref()).unwrap(), Value::Number(1.0));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_unknown_function() {
    let fx = sales_cube();
    let err = compile_err(&fx, &Exp::call("Bogus", vec![Exp::number(1.0)]));
    assert!(matches!(
        err,
        CompileError::UnknownFunction { ref name, ref syntax } if name == "Bogus" && syntax == "function"
    ));
    assert_eq!(err.function(), Some("Bogus"));
}

#[test]
fn test_known_name_with_other_syntax_is_unknown() {
    let fx = sales_cube();
    // Children exists only as a property
    let err = compile_err(&fx, &Exp::call("Children", vec![Exp::member(fx.drink)]));
    assert!(matches!(err, CompileError::UnknownFunction { .. }));
}

#[test]
fn test_argument_type_names_function_and_index() {
    let fx = sales_cube();
    let err = compile_err(&fx, &Exp::call("Avg", vec![Exp::number(5.0)]));
    assert_eq!(err.function(), Some("Avg"));
    assert_eq!(err.argument_index(), Some(0));
    assert_eq!(
        err.to_string(),
        "Function 'Avg' argument 0: expected set, found numeric"
    );
}

#[test]
fn test_argument_type_on_second_argument() {
    let fx = sales_cube();
    let err = compile_err(
        &fx,
        &Exp::call("Filter", vec![year_members(&fx), Exp::string("yes")]),
    );
    assert!(matches!(
        err,
        CompileError::ArgumentType { index: 1, ref expected, ref found, .. }
            if expected == "boolean" && found == "string"
    ));
}

#[test]
fn test_arity_lists_accepted_counts() {
    let fx = sales_cube();
    let err = compile_err(&fx, &Exp::call("Head", vec![]));
    assert!(matches!(
        err,
        CompileError::Arity { ref function, ref expected, found: 0 }
            if function == "Head" && expected == "1 to 2"
    ));

    let err = compile_err(
        &fx,
        &Exp::call(
            "IIf",
            vec![Exp::boolean(true), Exp::number(1.0)],
        ),
    );
    assert_eq!(
        err.to_string(),
        "Function 'IIf' expects 3 argument(s), found 2"
    );
}

#[test]
fn test_count_rejects_unknown_symbol() {
    let fx = sales_cube();
    let err = compile_err(
        &fx,
        &Exp::call("Count", vec![year_members(&fx), Exp::symbol("FOO")]),
    );
    assert!(matches!(err, CompileError::InvalidArgument { index: 1, .. }));
    assert!(err.to_string().contains("EXCLUDEEMPTY"));
}

#[test]
fn test_cross_join_rejects_repeated_hierarchy() {
    let fx = sales_cube();
    let err = compile_err(
        &fx,
        &Exp::call(
            "CrossJoin",
            vec![year_members(&fx), members_of(fx.time)],
        ),
    );
    assert!(matches!(
        err,
        CompileError::InvalidArgument { ref function, index: 1, .. } if function == "CrossJoin"
    ));
}

#[test]
fn test_tuple_rejects_repeated_hierarchy() {
    let fx = sales_cube();
    let err = compile_err(
        &fx,
        &Exp::tuple(vec![Exp::member(fx.y1997), Exp::member(fx.y1998)]),
    );
    assert!(matches!(err, CompileError::InvalidArgument { index: 1, .. }));
}

#[test]
fn test_union_requires_same_hierarchies() {
    let fx = sales_cube();
    let err = compile_err(
        &fx,
        &Exp::call(
            "Union",
            vec![year_members(&fx), members_of(fx.product)],
        ),
    );
    assert!(matches!(
        err,
        CompileError::InvalidArgument { ref function, index: 1, .. } if function == "Union"
    ));
}

#[test]
fn test_set_literal_requires_same_hierarchies() {
    let fx = sales_cube();
    let err = compile_err(
        &fx,
        &Exp::set(vec![
            Exp::member(fx.y1997),
            Exp::member(fx.y1998),
            Exp::member(fx.drink),
        ]),
    );
    assert!(matches!(err, CompileError::InvalidArgument { index: 2, .. }));
}

#[test]
fn test_descendants_level_from_other_hierarchy() {
    let fx = sales_cube();
    let err = compile_err(
        &fx,
        &Exp::call(
            "Descendants",
            vec![Exp::member(fx.y1997), Exp::level(fx.product, 2)],
        ),
    );
    assert!(matches!(err, CompileError::InvalidArgument { index: 1, .. }));
}

#[test]
fn test_unknown_level_is_invalid_member() {
    let fx = sales_cube();
    let err = compile_err(&fx, &Exp::property(Exp::level(fx.time, 9), "Members"));
    assert!(matches!(err, CompileError::InvalidMember(_)));
}

#[test]
fn test_result_style_mismatch() {
    let fx = sales_cube();
    let registry = FunctionRegistry::builtin();
    let err = Compiler::new(&fx.cube, &registry)
        .compile_list(&Exp::number(1.0))
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::ResultType { ref expected, ref found } if expected == "set" && found == "numeric"
    ));
}

// =============================================================================
// Defaults and dependencies
// =============================================================================

#[test]
fn test_omitted_aggregate_value_is_current_measure() {
    let fx = sales_cube();
    let implicit = compile(&fx, &Exp::call("Avg", vec![year_members(&fx)])).unwrap();
    let registry = FunctionRegistry::builtin();
    let compiler = Compiler::new(&fx.cube, &registry);
    let explicit = AggregateCalc::new(
        AggregateKind::Avg,
        compiler.compile_list(&year_members(&fx)).unwrap(),
        compiler.current_measure_value().unwrap(),
    )
    .unwrap();
    assert_eq!(implicit.header().key, explicit.header().key);
}

#[test]
fn test_head_defaults_to_one_element() {
    let fx = sales_cube();
    let value = evaluate(&fx, &Exp::call("Head", vec![year_members(&fx)]));
    assert_eq!(value, Value::List(TupleList::from_members([fx.y1997])));
}

#[test]
fn test_current_member_depends_on_its_hierarchy() {
    let fx = sales_cube();
    let calc = compile(
        &fx,
        &Exp::property(Exp::hierarchy(fx.time), "CurrentMember"),
    )
    .unwrap();
    assert_eq!(calc.header().dependencies, HierarchySet::single(fx.time));
    assert!(compile(&fx, &Exp::member(fx.y1997))
        .unwrap()
        .header()
        .dependencies
        .is_empty());
}

#[test]
fn test_identical_expressions_share_a_key() {
    let fx = sales_cube();
    let exp = Exp::call("Sum", vec![year_members(&fx), Exp::member(fx.sales)]);
    let a = compile(&fx, &exp).unwrap();
    let b = compile(&fx, &exp).unwrap();
    let c = compile(
        &fx,
        &Exp::call("Sum", vec![year_members(&fx), Exp::member(fx.units)]),
    )
    .unwrap();
    assert_eq!(a.header().key, b.header().key);
    assert_ne!(a.header().key, c.header().key);
}

#[test]
fn test_calculated_members_compile_as_scalars() {
    let fx = sales_cube();
    let registry = FunctionRegistry::builtin();
    let compiled = compile_calculated_members(&fx.cube, &registry).unwrap();
    assert_eq!(compiled.len(), 2);
    assert!(compiled.contains_key(&fx.sales_per_unit));
    assert!(compiled.contains_key(&fx.runaway));
}

// =============================================================================
// Built-in semantics
// =============================================================================

fn empty_cell(fx: &SalesCube, measure: MemberId) -> Exp {
    // nothing was sold in Oregon
    Exp::tuple(vec![Exp::member(measure), Exp::member(fx.oregon)])
}

#[test]
fn test_null_arithmetic() {
    let fx = sales_cube();
    assert_eq!(
        evaluate(&fx, &Exp::infix("+", empty_cell(&fx, fx.sales), Exp::number(5.0))),
        Value::Number(5.0)
    );
    assert_eq!(
        evaluate(
            &fx,
            &Exp::infix("+", empty_cell(&fx, fx.sales), empty_cell(&fx, fx.units))
        ),
        Value::Null
    );
    assert_eq!(
        evaluate(&fx, &Exp::infix("*", empty_cell(&fx, fx.sales), Exp::number(2.0))),
        Value::Null
    );
}

#[test]
fn test_is_empty_and_coalesce_empty() {
    let fx = sales_cube();
    assert_eq!(
        evaluate(&fx, &Exp::call("IsEmpty", vec![empty_cell(&fx, fx.sales)])),
        Value::Bool(true)
    );
    assert_eq!(
        evaluate(
            &fx,
            &Exp::call(
                "CoalesceEmpty",
                vec![empty_cell(&fx, fx.sales), Exp::number(0.0)]
            )
        ),
        Value::Number(0.0)
    );
}

#[test]
fn test_iif_evaluates_chosen_branch_only() {
    let fx = sales_cube();
    let value = evaluate(
        &fx,
        &Exp::call(
            "IIf",
            vec![
                Exp::infix(">", Exp::member(fx.sales), Exp::number(100.0)),
                Exp::string("big"),
                Exp::infix("/", Exp::number(1.0), Exp::number(0.0)),
            ],
        ),
    );
    assert_eq!(value, Value::String("big".into()));
}

#[test]
fn test_count_include_and_exclude_empty() {
    let fx = sales_cube();
    let include = evaluate(
        &fx,
        &Exp::call("Count", vec![state_members(&fx), Exp::symbol("INCLUDEEMPTY")]),
    );
    let exclude = evaluate(
        &fx,
        &Exp::call("Count", vec![state_members(&fx), Exp::symbol("EXCLUDEEMPTY")]),
    );
    let property = evaluate(&fx, &Exp::property(state_members(&fx), "Count"));
    assert_eq!(include, Value::Number(3.0));
    assert_eq!(exclude, Value::Number(2.0));
    assert_eq!(property, Value::Number(3.0));
}

#[test]
fn test_non_empty_cross_join() {
    let fx = sales_cube();
    let joined = Exp::call("CrossJoin", vec![year_members(&fx), state_members(&fx)]);
    let all = evaluate(&fx, &Exp::property(joined.clone(), "Count"));
    let non_empty = evaluate(
        &fx,
        &Exp::property(Exp::call("NonEmpty", vec![joined]), "Count"),
    );
    assert_eq!(all, Value::Number(6.0));
    // Oregon is empty in both years
    assert_eq!(non_empty, Value::Number(4.0));
}

#[test]
fn test_descendants_and_navigation() {
    let fx = sales_cube();
    assert_eq!(
        evaluate(
            &fx,
            &Exp::call(
                "Descendants",
                vec![Exp::member(fx.y1997), Exp::level(fx.time, 2)]
            )
        ),
        Value::List(TupleList::from_members([fx.q1_1997, fx.q2_1997]))
    );
    assert_eq!(
        evaluate(
            &fx,
            &Exp::property(Exp::property(Exp::member(fx.y1998), "PrevMember"), "Name")
        ),
        Value::String("1997".into())
    );
    assert_eq!(
        evaluate(&fx, &Exp::property(Exp::member(fx.beer), "Parent")),
        Value::Member(fx.drink)
    );
    assert_eq!(
        evaluate(&fx, &Exp::property(Exp::member(fx.y1998), "NextMember")),
        Value::Null
    );
}

#[test]
fn test_filter_keeps_matching_members() {
    let fx = sales_cube();
    let value = evaluate(
        &fx,
        &Exp::call(
            "Filter",
            vec![
                Exp::property(Exp::level(fx.product, 2), "Members"),
                Exp::infix(">", Exp::member(fx.sales), Exp::number(100.0)),
            ],
        ),
    );
    // Beer 170, Bread 110
    assert_eq!(
        value,
        Value::List(TupleList::from_members([fx.beer, fx.bread]))
    );
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn test_registry_signatures() {
    let registry = FunctionRegistry::standard();
    let sum = &registry.lookup("sum", Syntax::Function)[0];
    assert_eq!(sum.signature(), "Sum(set[, numeric])");

    let cross_join = &registry.lookup("CROSSJOIN", Syntax::Function)[0];
    assert_eq!(cross_join.arity(), "at least 2");
    assert!(cross_join.signature().ends_with(", ...)"));

    assert_eq!(registry.lookup("Members", Syntax::Property).len(), 2);
    assert_eq!(registry.lookup("()", Syntax::Parentheses).len(), 2);
    assert!(!registry.is_empty());
}
