//! End-to-end query execution against the SQLite star schema.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{sales_cube, SalesCube, SqliteExecutor};
use rolap::calc::Value;
use rolap::config::Settings;
use rolap::error::{CompileError, EvalError, ExecutionError};
use rolap::sql::Dialect;
use rolap::{CancellationToken, Engine, Exp, HierarchyId, MemberId, Query};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

fn engine(fx: &SalesCube) -> (Engine, Arc<SqliteExecutor>) {
    engine_with(fx, Dialect::Sqlite, Settings::default())
}

fn engine_with(
    fx: &SalesCube,
    dialect: Dialect,
    settings: Settings,
) -> (Engine, Arc<SqliteExecutor>) {
    let executor = Arc::new(SqliteExecutor::new());
    let engine =
        Engine::new(fx.cube.clone(), Arc::new(dialect), executor.clone()).with_settings(settings);
    (engine, executor)
}

fn years(fx: &SalesCube) -> Exp {
    Exp::property(Exp::level(fx.time, 1), "Members")
}

fn categories(fx: &SalesCube) -> Exp {
    Exp::property(Exp::level(fx.product, 1), "Members")
}

fn states(fx: &SalesCube) -> Exp {
    Exp::property(Exp::level(fx.store, 1), "Members")
}

fn values(result: &mut rolap::QueryResult) -> Vec<Value> {
    result
        .materialize()
        .unwrap()
        .iter()
        .map(|c| c.value().clone())
        .collect()
}

fn numbers(ns: &[f64]) -> Vec<Value> {
    ns.iter().map(|n| Value::Number(*n)).collect()
}

// =============================================================================
// Grids
// =============================================================================

#[test]
fn test_year_by_category_grid() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&Query::new().axis(years(&fx)).axis(categories(&fx)))
        .unwrap();

    assert_eq!(result.axis_count(), 2);
    assert_eq!(result.axis_len(0), Some(2));
    assert_eq!(result.axis_len(1), Some(2));
    assert_eq!(result.position(0, 1), Some(vec![fx.y1998]));
    assert_eq!(result.position(1, 0), Some(vec![fx.drink]));
    assert_eq!(result.cell_count(), 4);
    // axis 0 varies fastest
    assert_eq!(values(&mut result), numbers(&[60.0, 190.0, 40.0, 70.0]));
}

#[test]
fn test_cross_join_axis() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&Query::new().axis(Exp::call("CrossJoin", vec![years(&fx), categories(&fx)])))
        .unwrap();

    assert_eq!(result.axis_len(0), Some(4));
    assert_eq!(result.position(0, 1), Some(vec![fx.y1997, fx.food]));
    assert_eq!(values(&mut result), numbers(&[60.0, 40.0, 190.0, 70.0]));
}

#[test]
fn test_query_without_axes_has_one_cell() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine.execute(&Query::new()).unwrap();
    assert_eq!(result.cell_count(), 1);
    assert_eq!(result.cell(&[]).unwrap().value(), &Value::Number(360.0));
}

#[test]
fn test_filter_fixes_base_context() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&Query::new().axis(categories(&fx)).filter(vec![fx.y1998]))
        .unwrap();
    assert_eq!(values(&mut result), numbers(&[190.0, 70.0]));
}

#[test]
fn test_slicer_expression_replaces_current_measure() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let query = Query::new().axis(categories(&fx)).slicer(Exp::call(
        "Avg",
        vec![
            Exp::property(Exp::property(Exp::hierarchy(fx.product), "CurrentMember"), "Children"),
            Exp::member(fx.sales),
        ],
    ));
    let mut result = engine.execute(&query).unwrap();
    // Drink: (170 + 80) / 2, Food: 110
    assert_eq!(values(&mut result), numbers(&[125.0, 110.0]));
}

#[test]
fn test_filter_condition_is_read_per_category() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let query = Query::new().axis(categories(&fx)).slicer(Exp::call(
        "Count",
        vec![Exp::call(
            "Filter",
            vec![
                Exp::property(Exp::level(fx.time, 2), "Members"),
                Exp::infix(">", Exp::member(fx.sales), Exp::number(25.0)),
            ],
        )],
    ));
    let mut result = engine.execute(&query).unwrap();
    // Drink sells 30, 30, 110, 80 per quarter; Food only 40 and 70
    assert_eq!(values(&mut result), numbers(&[4.0, 2.0]));
}

// =============================================================================
// Non-empty axes
// =============================================================================

#[test]
fn test_non_empty_axis_drops_empty_positions() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);

    let mut plain = engine.execute(&Query::new().axis(states(&fx))).unwrap();
    assert_eq!(plain.axis_len(0), Some(3));
    assert_eq!(
        values(&mut plain),
        vec![Value::Number(200.0), Value::Number(160.0), Value::Null]
    );

    let mut filtered = engine
        .execute(&Query::new().non_empty_axis(states(&fx)).axis(years(&fx)))
        .unwrap();
    assert_eq!(filtered.axis_len(0), Some(2));
    assert_eq!(filtered.position(0, 1), Some(vec![fx.wa]));
    assert_eq!(filtered.cell_count(), 4);
}

#[test]
fn test_errors_keep_positions_on_non_empty_axes() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let query = Query::new()
        .non_empty_axis(states(&fx))
        .slicer(Exp::infix("/", Exp::number(1.0), Exp::number(0.0)));
    let result = engine.execute(&query).unwrap();
    assert_eq!(result.axis_len(0), Some(3));

    // null divided by zero is null, so the empty state is dropped
    let query = Query::new()
        .non_empty_axis(states(&fx))
        .slicer(Exp::infix("/", Exp::member(fx.sales), Exp::number(0.0)));
    let result = engine.execute(&query).unwrap();
    assert_eq!(result.axis_len(0), Some(2));
}

// =============================================================================
// Calculated members
// =============================================================================

#[test]
fn test_calculated_measure_alongside_stored_ones() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let axis = Exp::set(vec![
        Exp::member(fx.sales),
        Exp::member(fx.units),
        Exp::member(fx.sales_per_unit),
    ]);
    let mut result = engine
        .execute(&Query::new().axis(axis).axis(years(&fx)))
        .unwrap();

    // 1997: 100 / 10, 1998: 260 / 26
    assert_eq!(
        values(&mut result),
        numbers(&[100.0, 10.0, 10.0, 260.0, 26.0, 10.0])
    );
}

#[test]
fn test_self_referencing_member_is_a_cell_error() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&Query::new().axis(Exp::set(vec![Exp::member(fx.runaway), Exp::member(fx.sales)])))
        .unwrap();

    let runaway = result.cell(&[0]).unwrap();
    assert_eq!(runaway.error(), Some(&EvalError::RecursionLimit(64)));
    // the neighbouring cell is unaffected
    assert_eq!(result.cell(&[1]).unwrap().value(), &Value::Number(360.0));
}

#[test]
fn test_recursion_limit_comes_from_settings() {
    let fx = sales_cube();
    let settings = Settings::from_toml_str("[engine]\nmax_eval_depth = 8\n").unwrap();
    let (engine, _) = engine_with(&fx, Dialect::Sqlite, settings);
    let mut result = engine
        .execute(&Query::new().axis(Exp::set(vec![Exp::member(fx.runaway)])))
        .unwrap();
    assert_eq!(
        result.cell(&[0]).unwrap().error(),
        Some(&EvalError::RecursionLimit(8))
    );
}

// =============================================================================
// SQL issued
// =============================================================================

#[test]
fn test_siblings_are_loaded_with_one_statement() {
    let fx = sales_cube();
    let (engine, executor) = engine(&fx);
    let mut result = engine.execute(&Query::new().axis(categories(&fx))).unwrap();
    assert_eq!(values(&mut result), numbers(&[250.0, 110.0]));

    let cell_sql = executor.statements_from("cell");
    assert_eq!(cell_sql.len(), 1);
    assert!(cell_sql[0].contains("GROUP BY"));
    assert_eq!(executor.statements_from("statistics").len(), 1);
}

#[test]
fn test_without_statistics_each_cell_is_read_alone() {
    let fx = sales_cube();
    let settings = Settings::from_toml_str("[statistics]\nenabled = false\n").unwrap();
    let (engine, executor) = engine_with(&fx, Dialect::Sqlite, settings);
    let mut result = engine.execute(&Query::new().axis(categories(&fx))).unwrap();
    assert_eq!(values(&mut result), numbers(&[250.0, 110.0]));

    let cell_sql = executor.statements_from("cell");
    assert_eq!(cell_sql.len(), 2);
    assert!(cell_sql.iter().all(|sql| !sql.contains("GROUP BY")));
    assert!(executor.statements_from("statistics").is_empty());
}

#[test]
fn test_small_prefetch_limit_disables_segments() {
    let fx = sales_cube();
    let mut settings = Settings::default();
    settings.engine.segment_prefetch_limit = 1;
    let (engine, executor) = engine_with(&fx, Dialect::Sqlite, settings);
    let mut result = engine.execute(&Query::new().axis(categories(&fx))).unwrap();
    assert_eq!(values(&mut result), numbers(&[250.0, 110.0]));
    assert_eq!(executor.statements_from("cell").len(), 2);
}

#[test]
fn test_every_statement_parses_as_sqlite() {
    let fx = sales_cube();
    let (engine, executor) = engine(&fx);
    let mut result = engine
        .execute(
            &Query::new()
                .axis(Exp::call("CrossJoin", vec![years(&fx), states(&fx)]))
                .axis(Exp::set(vec![Exp::member(fx.sales), Exp::member(fx.customers)])),
        )
        .unwrap();
    result.materialize().unwrap();
    result.cell(&[0, 0]).unwrap().drill_through(5).unwrap();

    let statements = executor.statements();
    assert!(!statements.is_empty());
    for sql in statements {
        Parser::parse_sql(&SQLiteDialect {}, &sql).unwrap_or_else(|e| panic!("{e}: {sql}"));
    }
}

#[test]
fn test_distinct_count_needs_dialect_support() {
    let fx = sales_cube();
    let axis = Exp::set(vec![Exp::member(fx.customers)]);

    let (access, executor) = engine_with(&fx, Dialect::Access, Settings::default());
    let mut result = access.execute(&Query::new().axis(axis.clone())).unwrap();
    let cell = result.cell(&[0]).unwrap();
    assert!(matches!(cell.error(), Some(EvalError::Unsupported(_))));
    assert!(executor.statements().is_empty());

    let (sqlite, _) = engine(&fx);
    let mut result = sqlite.execute(&Query::new().axis(axis)).unwrap();
    assert_eq!(result.cell(&[0]).unwrap().value(), &Value::Number(5.0));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_compile_error_issues_no_sql() {
    let fx = sales_cube();
    let (engine, executor) = engine(&fx);
    let err = engine
        .execute(&Query::new().axis(Exp::call("Bogus", vec![])))
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::Compile(CompileError::UnknownFunction { .. })
    ));
    assert!(executor.statements().is_empty());
}

#[test]
fn test_unknown_filter_member_is_a_compile_error() {
    let fx = sales_cube();
    let (engine, executor) = engine(&fx);
    let outside_cube = MemberId::new(HierarchyId(42), 0);
    let no_such_year = MemberId::new(fx.time, 999);

    for member in [outside_cube, no_such_year] {
        let err = engine
            .execute(&Query::new().axis(years(&fx)).filter(vec![fx.y1997, member]))
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Compile(CompileError::InvalidMember(ref name)) if name == &member.to_string()
        ));
    }
    assert!(executor.statements().is_empty());
}

#[test]
fn test_axis_evaluation_error_names_the_axis() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    // Head with a null count
    let bad = Exp::call(
        "Head",
        vec![
            years(&fx),
            Exp::tuple(vec![Exp::member(fx.sales), Exp::member(fx.oregon)]),
        ],
    );
    let err = engine
        .execute(&Query::new().axis(categories(&fx)).axis(bad))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Eval { axis: 1, .. }));
}

#[test]
fn test_invalid_coordinate() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&Query::new().axis(years(&fx)).axis(categories(&fx)))
        .unwrap();

    assert!(matches!(
        result.cell(&[2, 0]),
        Err(ExecutionError::InvalidCoordinate { ref lengths, .. }) if lengths == &[2, 2]
    ));
    assert!(matches!(
        result.cell(&[0]),
        Err(ExecutionError::InvalidCoordinate { .. })
    ));
}

#[test]
fn test_cancelled_before_execution() {
    let fx = sales_cube();
    let (engine, executor) = engine(&fx);
    let token = CancellationToken::new();
    token.cancel();
    let err = engine
        .execute_with_cancel(&Query::new().axis(years(&fx)), token)
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Cancelled));
    assert!(executor.statements().is_empty());
}

#[test]
fn test_cancelled_between_cells() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let token = CancellationToken::new();
    let mut result = engine
        .execute_with_cancel(&Query::new().axis(years(&fx)), token.clone())
        .unwrap();
    assert!(result.cell(&[0]).is_ok());

    token.cancel();
    assert!(matches!(result.cell(&[1]), Err(ExecutionError::Cancelled)));
    assert_eq!(result.cache_stats().entries, 0);
}

// =============================================================================
// Configuration and diagnostics
// =============================================================================

#[test]
fn test_engine_from_toml_settings() {
    let fx = sales_cube();
    let settings = Settings::from_toml_str(
        r#"
[engine]
drill_through_max_rows = 10

[dialect]
name = "sqlite"
"#,
    )
    .unwrap();
    let executor = Arc::new(SqliteExecutor::new());
    let engine = Engine::from_settings(fx.cube.clone(), executor.clone(), settings).unwrap();

    assert_eq!(engine.dialect().name(), "sqlite");
    assert_eq!(engine.settings().engine.drill_through_max_rows, 10);
    let mut result = engine.execute(&Query::new().axis(years(&fx))).unwrap();
    assert_eq!(values(&mut result), numbers(&[100.0, 260.0]));
}

#[test]
fn test_engine_rejects_unknown_dialect() {
    let fx = sales_cube();
    let mut settings = Settings::default();
    settings.dialect.name = "cobol".into();
    let executor = Arc::new(SqliteExecutor::new());
    assert!(Engine::from_settings(fx.cube.clone(), executor, settings).is_err());
}

#[test]
fn test_timings_count_cells_and_axes() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&Query::new().axis(years(&fx)).axis(categories(&fx)))
        .unwrap();
    result.materialize().unwrap();

    assert_eq!(result.timings().get("axis").unwrap().count, 2);
    assert_eq!(result.timings().get("cell").unwrap().count, 4);
}

#[test]
fn test_prepared_query_reports_axes() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let prepared = engine
        .prepare(&Query::new().axis(years(&fx)).non_empty_axis(categories(&fx)))
        .unwrap();
    assert_eq!(prepared.axis_count(), 2);
    assert!(prepared.axis(2).is_none());
}
