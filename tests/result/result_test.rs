//! Cells: values, formatting, error capture and drill-through.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{sales_cube, MemoryReader, SalesCube, SqliteExecutor};
use rolap::calc::{TupleList, Value};
use rolap::compiler::{Compiler, FunctionRegistry};
use rolap::config::{EngineSettings, Settings};
use rolap::error::EvalError;
use rolap::eval::Evaluator;
use rolap::result::{format_number, format_value, CancellationToken, DrillThrough, QueryResult};
use rolap::schema::{Aggregator, HierarchyRelation, Measure};
use rolap::sql::{Dialect, TableName};
use rolap::statement::SqlValue;
use rolap::{Cube, Engine, Exp, Query};

fn engine(fx: &SalesCube) -> (Engine, Arc<SqliteExecutor>) {
    let executor = Arc::new(SqliteExecutor::new());
    let engine = Engine::new(fx.cube.clone(), Arc::new(Dialect::Sqlite), executor.clone());
    (engine, executor)
}

/// Years across, categories down.
fn year_by_category(fx: &SalesCube) -> Query {
    Query::new()
        .axis(Exp::property(Exp::level(fx.time, 1), "Members"))
        .axis(Exp::property(Exp::level(fx.product, 1), "Members"))
}

fn measures_axis(members: &[rolap::MemberId]) -> Query {
    Query::new().axis(Exp::set(members.iter().map(|m| Exp::member(*m)).collect()))
}

fn rows(drill: DrillThrough) -> rolap::statement::Rows {
    match drill {
        DrillThrough::Rows(rows) => rows,
        DrillThrough::Unsupported(reason) => panic!("drill-through unsupported: {reason}"),
    }
}

// =============================================================================
// Values and formatting
// =============================================================================

#[test]
fn test_cell_reports_coordinate_and_context() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine.execute(&year_by_category(&fx)).unwrap();

    let cell = result.cell(&[1, 0]).unwrap();
    assert_eq!(cell.coordinate(), &[1, 0]);
    assert_eq!(cell.members()[fx.time.index()], fx.y1998);
    assert_eq!(cell.members()[fx.product.index()], fx.drink);
    assert_eq!(cell.members()[rolap::HierarchyId::MEASURES.index()], fx.sales);
    assert_eq!(cell.value(), &Value::Number(190.0));
    assert_eq!(cell.format_string(), Some("Standard"));
    assert_eq!(cell.formatted_value(), "190.00");
}

#[test]
fn test_format_follows_each_measure() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&measures_axis(&[fx.sales, fx.units, fx.sales_per_unit, fx.customers]))
        .unwrap();

    let formatted: Vec<String> = result
        .materialize()
        .unwrap()
        .iter()
        .map(|c| c.formatted_value().to_string())
        .collect();
    assert_eq!(formatted, vec!["360.00", "36", "10.00", "5"]);
}

#[test]
fn test_empty_cell_formats_as_empty_string() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&Query::new().axis(Exp::set(vec![Exp::member(fx.oregon)])))
        .unwrap();

    let cell = result.cell(&[0]).unwrap();
    assert!(cell.is_null());
    assert!(!cell.is_error());
    assert_eq!(cell.formatted_value(), "");
}

#[test]
fn test_error_is_captured_per_cell() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let query = Query::new()
        .axis(Exp::property(Exp::level(fx.time, 1), "Members"))
        .slicer(Exp::infix("/", Exp::member(fx.sales), Exp::number(0.0)));
    let mut result = engine.execute(&query).unwrap();

    for cell in result.materialize().unwrap() {
        assert!(cell.is_error());
        assert_eq!(cell.error(), Some(&EvalError::DivisionByZero));
        assert_eq!(cell.formatted_value(), "#ERR: Division by zero");
    }
}

#[test]
fn test_formatted_value_is_computed_once() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine.execute(&year_by_category(&fx)).unwrap();
    let cell = result.cell(&[0, 1]).unwrap();
    let first: *const str = cell.formatted_value();
    let second: *const str = cell.formatted_value();
    assert_eq!(first, second);
    assert_eq!(cell.formatted_value(), "40.00");
}

#[test]
fn test_format_value_for_non_numeric_values() {
    assert_eq!(format_value(&Value::String("Drink".into()), Some("Standard")), "Drink");
    assert_eq!(format_value(&Value::Bool(true), None), "true");
    assert_eq!(format_number(-1234.5, "#,##0.00"), "-1,234.50");
    assert_eq!(format_number(0.25, "0.0%"), "25.0%");
    assert_eq!(format_number(1e20, "Standard"), "100,000,000,000,000,000,000.00");
}

// =============================================================================
// Drill-through
// =============================================================================

#[test]
fn test_drill_through_returns_fact_rows() {
    let fx = sales_cube();
    let (engine, executor) = engine(&fx);
    let mut result = engine.execute(&year_by_category(&fx)).unwrap();

    // 1997 x Food
    let cell = result.cell(&[0, 1]).unwrap();
    let rows = rows(cell.drill_through(100).unwrap());
    assert_eq!(rows.len(), 1);
    let amount = rows.column_index("amount").unwrap();
    let row = rows.iter().next().unwrap();
    assert_eq!(row[amount].as_f64(), Some(40.0));

    let statements = executor.statements_from("drill-through");
    assert_eq!(statements.len(), 1);
    assert!(statements[0].starts_with("SELECT \"sales_fact\".* FROM \"sales_fact\""));
    assert!(statements[0].ends_with("LIMIT 100"));
}

#[test]
fn test_drill_through_honours_row_caps() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine.execute(&year_by_category(&fx)).unwrap();

    // 1997 x Drink has three fact rows
    let cell = result.cell(&[0, 0]).unwrap();
    assert_eq!(rows(cell.drill_through(100).unwrap()).len(), 3);
    assert_eq!(rows(cell.drill_through(2).unwrap()).len(), 2);

    let mut settings = Settings::default();
    settings.engine.drill_through_max_rows = 1;
    let (engine, _) = self::engine(&fx);
    let mut capped = engine
        .with_settings(settings)
        .execute(&year_by_category(&fx))
        .unwrap();
    let cell = capped.cell(&[0, 0]).unwrap();
    assert_eq!(rows(cell.drill_through(100).unwrap()).len(), 1);
}

#[test]
fn test_drill_through_on_empty_cell_is_empty() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&Query::new().axis(Exp::set(vec![Exp::member(fx.oregon)])))
        .unwrap();
    let drill = result.cell(&[0]).unwrap().drill_through(10).unwrap();
    assert!(drill.is_supported());
    assert!(rows(drill).is_empty());
}

#[test]
fn test_drill_through_on_calculated_measure_is_unsupported() {
    let fx = sales_cube();
    let (engine, executor) = engine(&fx);
    let mut result = engine.execute(&measures_axis(&[fx.sales_per_unit])).unwrap();

    let drill = result.cell(&[0]).unwrap().drill_through(10).unwrap();
    assert!(matches!(drill, DrillThrough::Unsupported(ref reason) if reason.contains("not a stored measure")));
    assert!(executor.statements_from("drill-through").is_empty());
}

#[test]
fn test_drill_through_below_level_without_column_is_unsupported() {
    let mut b = Cube::builder("Regions", TableName::new("sales_fact"));
    b.add_measure(Measure::new("Sales", "amount", Aggregator::Sum));
    let region = b.add_hierarchy("Region", HierarchyRelation::Fact).unwrap();
    b.add_level_without_column(region, "Region").unwrap();
    let west = b.add_member(region, None, "West", "West").unwrap();
    let cube = Arc::new(b.build().unwrap());

    let executor = Arc::new(SqliteExecutor::new());
    let engine = Engine::new(cube, Arc::new(Dialect::Sqlite), executor.clone());
    let mut result = engine
        .execute(&Query::new().axis(Exp::set(vec![Exp::member(west)])))
        .unwrap();
    let cell = result.cell(&[0]).unwrap();
    assert!(matches!(cell.value(), Value::Error(_)));

    let drill = cell.drill_through(10).unwrap();
    assert!(matches!(
        drill,
        DrillThrough::Unsupported(ref reason) if reason.contains("no key column at depth 1")
    ));
    assert!(executor.statements_from("drill-through").is_empty());
}

#[test]
fn test_drill_through_without_executor_is_unsupported() {
    let fx = sales_cube();
    let (reader, _) = MemoryReader::new();
    let evaluator = Evaluator::new(fx.cube.clone(), Box::new(reader), &EngineSettings::default());
    let registry = FunctionRegistry::builtin();
    let slicer = Compiler::new(&fx.cube, &registry)
        .current_measure_value()
        .unwrap();
    let mut result = QueryResult::new(
        evaluator,
        slicer,
        vec![(TupleList::from_members([fx.drink, fx.food]), false)],
        CancellationToken::new(),
    )
    .unwrap();

    let cell = result.cell(&[0]).unwrap();
    assert_eq!(cell.value(), &Value::Number(250.0));
    assert_eq!(
        cell.drill_through(10).unwrap(),
        DrillThrough::Unsupported("result has no statement executor".into())
    );
}

#[test]
fn test_drill_through_rows_carry_fact_columns() {
    let fx = sales_cube();
    let (engine, _) = engine(&fx);
    let mut result = engine
        .execute(&Query::new().axis(Exp::set(vec![Exp::member(fx.wa)])))
        .unwrap();
    let rows = rows(result.cell(&[0]).unwrap().drill_through(10).unwrap());

    let state = rows.column_index("store_state").unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows
        .iter()
        .all(|row| row[state] == SqlValue::Text("WA".into())));
}
