//! # rolap
//!
//! Core of a relational OLAP engine: compiles multidimensional query
//! expressions, evaluates them against a star schema through generated SQL,
//! and exposes the result as a grid of cells.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Query (axes, slicer, filter) over a Cube          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compiler + function registry]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Calc trees (typed nodes, keys, dependencies)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [evaluator + context savepoints + cache]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Cell reads ─▶ SQL builder ─▶ StatementExecutor       │
//! │     Statistics ─▶ segment prefetch decisions             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [result façade]
//! ┌─────────────────────────────────────────────────────────┐
//! │     QueryResult / Cell (value, format, drill-through)    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod calc;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod metadata;
pub mod query;
pub mod reader;
pub mod result;
pub mod schema;
pub mod sql;
pub mod statement;
pub mod stats;

pub use engine::{Engine, PreparedQuery};
pub use error::{CompileError, EvalError, ExecutionError, SavepointDisciplineError};
pub use query::{Exp, Query, QueryAxis, Syntax};
pub use result::{CancellationToken, Cell, DrillThrough, QueryResult};
pub use schema::{Cube, CubeBuilder, HierarchyId, MemberId};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::calc::{Calc, CalcRef, Value};
    pub use crate::compiler::{CompileHint, Compiler, FunctionRegistry};
    pub use crate::config::Settings;
    pub use crate::engine::Engine;
    pub use crate::eval::Evaluator;
    pub use crate::query::{Exp, Query};
    pub use crate::result::{CancellationToken, Cell, DrillThrough, QueryResult};
    pub use crate::schema::{
        Aggregator, Cube, HierarchyId, HierarchyRelation, Measure, MemberId,
    };
    pub use crate::sql::{Dialect, SqlDialect, TableName};
    pub use crate::statement::{Locus, Rows, SqlValue, StatementExecutor};
}
