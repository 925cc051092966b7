//! Error types for compilation, evaluation and execution.
//!
//! Compile errors surface before any evaluation starts. Evaluation errors are
//! values: they travel inside `Value::Error` and end up attached to the one
//! cell that produced them. Execution errors abort a whole query.

use std::fmt;

use thiserror::Error;

use crate::statement::StatementError;

/// Result type for expression compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Result type for calculation evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// An expression did not match any function signature.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("No function matches the signature '{name}' ({syntax})")]
    UnknownFunction { name: String, syntax: String },

    #[error("Function '{function}' expects {expected} argument(s), found {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("Function '{function}' argument {index}: expected {expected}, found {found}")]
    ArgumentType {
        function: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Function '{function}' argument {index}: {reason}")]
    InvalidArgument {
        function: String,
        index: usize,
        reason: String,
    },

    #[error("Unknown member: {0}")]
    InvalidMember(String),

    #[error("Expression yields {found}, expected {expected}")]
    ResultType { expected: String, found: String },

    #[error("Failed to derive calculation key: {0}")]
    Key(#[from] serde_json::Error),
}

impl CompileError {
    /// Name of the offending function, when the error concerns one.
    pub fn function(&self) -> Option<&str> {
        match self {
            CompileError::UnknownFunction { name, .. } => Some(name),
            CompileError::Arity { function, .. }
            | CompileError::ArgumentType { function, .. }
            | CompileError::InvalidArgument { function, .. } => Some(function),
            _ => None,
        }
    }

    /// Zero-based index of the offending argument.
    pub fn argument_index(&self) -> Option<usize> {
        match self {
            CompileError::ArgumentType { index, .. }
            | CompileError::InvalidArgument { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// A calculation failed at runtime.
///
/// Cloneable so it can be stored in a cell value and in cached results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Type error: {0}")]
    Type(String),

    #[error("Statement failed: {0}")]
    Statement(String),

    #[error("Evaluation nested deeper than {0} levels")]
    RecursionLimit(usize),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Calculated member failed to compile: {0}")]
    Compile(String),
}

impl From<StatementError> for EvalError {
    fn from(err: StatementError) -> Self {
        if let StatementError::Unsupported(reason) = err {
            EvalError::Unsupported(reason)
        } else {
            EvalError::Statement(err.to_string())
        }
    }
}

/// A savepoint was restored out of order or on the wrong context.
///
/// Raised with `panic!`: it means the evaluator itself is broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavepointDisciplineError {
    /// The token is not the most recent active savepoint.
    OutOfOrder { serial: u64, active: Option<u64> },
    /// The token was issued by another context.
    ForeignContext { serial: u64, owner: u64, context: u64 },
}

impl fmt::Display for SavepointDisciplineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder {
                serial,
                active: Some(active),
            } => write!(
                f,
                "savepoint {serial} restored while savepoint {active} is the most recent"
            ),
            Self::OutOfOrder {
                serial,
                active: None,
            } => write!(f, "savepoint {serial} restored with no savepoint active"),
            Self::ForeignContext {
                serial,
                owner,
                context,
            } => write!(
                f,
                "savepoint {serial} of context {owner} restored on context {context}"
            ),
        }
    }
}

impl std::error::Error for SavepointDisciplineError {}

/// A query could not be executed.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("Query was cancelled")]
    Cancelled,

    #[error("Axis {axis} could not be evaluated: {source}")]
    Eval {
        axis: usize,
        #[source]
        source: EvalError,
    },

    #[error("Coordinate {coordinate:?} is outside the result (axis lengths {lengths:?})")]
    InvalidCoordinate {
        coordinate: Vec<usize>,
        lengths: Vec<usize>,
    },
}
