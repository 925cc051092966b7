//! Shared fixtures: a small sales star schema, available both as an
//! in-memory SQLite database and as a pure in-memory cell reader.
//!
//! | time_id | year | quarter |   | product_id | category | name  |
//! |---------|------|---------|   |------------|----------|-------|
//! | 1       | 1997 | Q1      |   | 1          | Drink    | Beer  |
//! | 2       | 1997 | Q2      |   | 2          | Drink    | Wine  |
//! | 3       | 1998 | Q1      |   | 3          | Food     | Bread |
//! | 4       | 1998 | Q2      |
//!
//! Store states live in the fact table; `OR` is a member without fact rows.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rolap::calc::Value;
use rolap::error::{EvalError, EvalResult};
use rolap::query::Exp;
use rolap::reader::CellReader;
use rolap::schema::{
    Aggregator, Cube, HierarchyId, HierarchyRelation, Measure, MemberId,
};
use rolap::sql::TableName;
use rolap::statement::{Locus, Rows, SqlValue, StatementError, StatementExecutor, StatementResult};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

// =============================================================================
// Data
// =============================================================================

pub struct Fact {
    pub time_id: i64,
    pub product_id: i64,
    pub state: &'static str,
    pub amount: f64,
    pub units: i64,
    pub customer_id: i64,
}

const fn fact(
    time_id: i64,
    product_id: i64,
    state: &'static str,
    amount: f64,
    units: i64,
    customer_id: i64,
) -> Fact {
    Fact {
        time_id,
        product_id,
        state,
        amount,
        units,
        customer_id,
    }
}

pub const TIMES: [(i64, i64, &str); 4] = [
    (1, 1997, "Q1"),
    (2, 1997, "Q2"),
    (3, 1998, "Q1"),
    (4, 1998, "Q2"),
];

pub const PRODUCTS: [(i64, &str, &str); 3] =
    [(1, "Drink", "Beer"), (2, "Drink", "Wine"), (3, "Food", "Bread")];

pub const FACTS: [Fact; 8] = [
    fact(1, 1, "CA", 10.0, 1, 100),
    fact(1, 2, "CA", 20.0, 2, 101),
    fact(2, 1, "WA", 30.0, 3, 100),
    fact(2, 3, "CA", 40.0, 4, 102),
    fact(3, 1, "CA", 50.0, 5, 103),
    fact(3, 2, "WA", 60.0, 6, 100),
    fact(4, 3, "WA", 70.0, 7, 101),
    fact(4, 1, "CA", 80.0, 8, 104),
];

// =============================================================================
// Cube
// =============================================================================

/// The sales cube and the ids tests refer to.
pub struct SalesCube {
    pub cube: Arc<Cube>,
    pub time: HierarchyId,
    pub product: HierarchyId,
    pub store: HierarchyId,
    pub sales: MemberId,
    pub units: MemberId,
    pub customers: MemberId,
    pub sales_per_unit: MemberId,
    /// Calculated member defined in terms of itself.
    pub runaway: MemberId,
    pub y1997: MemberId,
    pub y1998: MemberId,
    pub q1_1997: MemberId,
    pub q2_1997: MemberId,
    pub drink: MemberId,
    pub food: MemberId,
    pub beer: MemberId,
    pub wine: MemberId,
    pub bread: MemberId,
    pub ca: MemberId,
    pub wa: MemberId,
    pub oregon: MemberId,
}

pub fn sales_cube() -> SalesCube {
    let mut b = Cube::builder("Sales", TableName::new("sales_fact"));
    let sales = b.add_measure(Measure::new("Sales", "amount", Aggregator::Sum).with_format("Standard"));
    let units = b.add_measure(Measure::new("Units", "units", Aggregator::Sum).with_format("#,##0"));
    let customers = b.add_measure(Measure::new(
        "Customers",
        "customer_id",
        Aggregator::DistinctCount,
    ));
    let sales_per_unit = b.add_calculated_member(
        "Sales per Unit",
        Exp::infix("/", Exp::member(sales), Exp::member(units)),
        Some("#,##0.00"),
    );
    let runaway = b.add_calculated_member("Runaway", Exp::number(0.0), None);
    b.add_calculated_member(
        "Runaway",
        Exp::infix("+", Exp::member(runaway), Exp::number(1.0)),
        None,
    );

    let time = b
        .add_hierarchy(
            "Time",
            HierarchyRelation::Table {
                table: TableName::new("time_dim"),
                primary_key: "time_id".into(),
                foreign_key: "time_id".into(),
            },
        )
        .unwrap();
    b.add_level(time, "Year", "year").unwrap();
    b.add_level(time, "Quarter", "quarter").unwrap();
    let y1997 = b.add_member(time, None, "1997", 1997).unwrap();
    let q1_1997 = b.add_member(time, Some(y1997), "Q1", "Q1").unwrap();
    let q2_1997 = b.add_member(time, Some(y1997), "Q2", "Q2").unwrap();
    let y1998 = b.add_member(time, None, "1998", 1998).unwrap();
    b.add_member(time, Some(y1998), "Q1", "Q1").unwrap();
    b.add_member(time, Some(y1998), "Q2", "Q2").unwrap();

    let product = b
        .add_hierarchy(
            "Product",
            HierarchyRelation::Table {
                table: TableName::new("product_dim"),
                primary_key: "product_id".into(),
                foreign_key: "product_id".into(),
            },
        )
        .unwrap();
    b.add_level(product, "Category", "category").unwrap();
    b.add_level(product, "Product", "name").unwrap();
    let drink = b.add_member(product, None, "Drink", "Drink").unwrap();
    let beer = b.add_member(product, Some(drink), "Beer", "Beer").unwrap();
    let wine = b.add_member(product, Some(drink), "Wine", "Wine").unwrap();
    let food = b.add_member(product, None, "Food", "Food").unwrap();
    let bread = b.add_member(product, Some(food), "Bread", "Bread").unwrap();

    let store = b.add_hierarchy("Store", HierarchyRelation::Fact).unwrap();
    b.add_level(store, "State", "store_state").unwrap();
    let ca = b.add_member(store, None, "CA", "CA").unwrap();
    let wa = b.add_member(store, None, "WA", "WA").unwrap();
    let oregon = b.add_member(store, None, "OR", "OR").unwrap();

    SalesCube {
        cube: Arc::new(b.build().unwrap()),
        time,
        product,
        store,
        sales,
        units,
        customers,
        sales_per_unit,
        runaway,
        y1997,
        y1998,
        q1_1997,
        q2_1997,
        drink,
        food,
        beer,
        wine,
        bread,
        ca,
        wa,
        oregon,
    }
}

// =============================================================================
// In-memory cell reader
// =============================================================================

/// Aggregates [`FACTS`] directly and counts how often it was asked.
pub struct MemoryReader {
    reads: Arc<AtomicUsize>,
}

impl MemoryReader {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        (
            Self {
                reads: Arc::clone(&reads),
            },
            reads,
        )
    }
}

impl CellReader for MemoryReader {
    fn read(&mut self, cube: &Cube, coordinate: &[MemberId]) -> EvalResult<Value> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let measure = coordinate
            .first()
            .and_then(|m| cube.member(*m))
            .and_then(|m| m.measure())
            .and_then(|id| cube.measure(id))
            .ok_or_else(|| EvalError::Type("not a stored measure".into()))?;

        let rows: Vec<&Fact> = FACTS
            .iter()
            .filter(|f| coordinate.iter().all(|m| fact_matches(cube, *m, f)))
            .collect();
        if rows.is_empty() {
            return Ok(Value::Null);
        }
        let value = match (measure.aggregator, measure.column.as_str()) {
            (Aggregator::DistinctCount, _) => {
                rows.iter().map(|f| f.customer_id).collect::<HashSet<_>>().len() as f64
            }
            (_, "units") => rows.iter().map(|f| f.units as f64).sum(),
            _ => rows.iter().map(|f| f.amount).sum(),
        };
        Ok(Value::Number(value))
    }
}

fn fact_matches(cube: &Cube, member: MemberId, fact: &Fact) -> bool {
    let hierarchy = cube.hierarchy(member.hierarchy);
    if hierarchy.is_measures() {
        return true;
    }
    hierarchy.path(member).iter().all(|m| {
        match (m.key.as_ref(), level_value(hierarchy.name(), m.depth, fact)) {
            (Some(key), Some(value)) => key.matches(&value),
            _ => false,
        }
    })
}

fn level_value(hierarchy: &str, depth: usize, fact: &Fact) -> Option<SqlValue> {
    let time = TIMES.iter().find(|t| t.0 == fact.time_id)?;
    let product = PRODUCTS.iter().find(|p| p.0 == fact.product_id)?;
    Some(match (hierarchy, depth) {
        ("Time", 1) => SqlValue::Int(time.1),
        ("Time", 2) => SqlValue::Text(time.2.into()),
        ("Product", 1) => SqlValue::Text(product.1.into()),
        ("Product", 2) => SqlValue::Text(product.2.into()),
        ("Store", 1) => SqlValue::Text(fact.state.into()),
        _ => return None,
    })
}

// =============================================================================
// Statement executors
// =============================================================================

/// Runs statements against an in-memory SQLite copy of the star schema and
/// records every statement it receives.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
    log: Mutex<Vec<(String, Locus)>>,
}

impl SqliteExecutor {
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE time_dim (time_id INTEGER PRIMARY KEY, year INTEGER NOT NULL, quarter TEXT NOT NULL);
             CREATE TABLE product_dim (product_id INTEGER PRIMARY KEY, category TEXT NOT NULL, name TEXT NOT NULL);
             CREATE TABLE sales_fact (
                 time_id INTEGER NOT NULL,
                 product_id INTEGER NOT NULL,
                 store_state TEXT NOT NULL,
                 amount REAL NOT NULL,
                 units INTEGER NOT NULL,
                 customer_id INTEGER NOT NULL
             );",
        )
        .unwrap();
        for (id, year, quarter) in TIMES {
            conn.execute(
                "INSERT INTO time_dim VALUES (?1, ?2, ?3)",
                rusqlite::params![id, year, quarter],
            )
            .unwrap();
        }
        for (id, category, name) in PRODUCTS {
            conn.execute(
                "INSERT INTO product_dim VALUES (?1, ?2, ?3)",
                rusqlite::params![id, category, name],
            )
            .unwrap();
        }
        for f in &FACTS {
            conn.execute(
                "INSERT INTO sales_fact VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    f.time_id,
                    f.product_id,
                    f.state,
                    f.amount,
                    f.units,
                    f.customer_id
                ],
            )
            .unwrap();
        }
        Self {
            conn: Mutex::new(conn),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Statements executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    /// Statements issued by one component (`"cell"`, `"statistics"`, ...).
    pub fn statements_from(&self, component: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, locus)| locus.component == component)
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }
}

impl StatementExecutor for SqliteExecutor {
    fn execute(&self, sql: &str, locus: &Locus) -> StatementResult<Rows> {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), locus.clone()));
        let conn = self.conn.lock().unwrap();
        run_query(&conn, sql).map_err(|e| StatementError::failed(sql, e.to_string()))
    }
}

fn run_query(conn: &Connection, sql: &str) -> rusqlite::Result<Rows> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut out = Rows::new(columns);
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(match row.get_ref(i)? {
                ValueRef::Null | ValueRef::Blob(_) => SqlValue::Null,
                ValueRef::Integer(n) => SqlValue::Int(n),
                ValueRef::Real(x) => SqlValue::Float(x),
                ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            });
        }
        out.push(values);
    }
    Ok(out)
}

/// Answers every statement with the same canned response.
pub struct RecordingExecutor {
    response: StatementResult<Rows>,
    log: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    /// Every statement returns a single-cell row holding `n`.
    pub fn count(n: i64) -> Self {
        let mut rows = Rows::new(vec!["c".into()]);
        rows.push(vec![SqlValue::Int(n)]);
        Self::responding(Ok(rows))
    }

    /// Every statement fails.
    pub fn failing() -> Self {
        Self::responding(Err(StatementError::ConnectionFailed("connection reset".into())))
    }

    pub fn responding(response: StatementResult<Rows>) -> Self {
        Self {
            response,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl StatementExecutor for RecordingExecutor {
    fn execute(&self, sql: &str, _locus: &Locus) -> StatementResult<Rows> {
        self.log.lock().unwrap().push(sql.to_string());
        self.response.clone()
    }
}
