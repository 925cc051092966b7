//! Function signatures and the strategies that compile them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::{builtins, CompiledArg, Compiler};
use crate::calc::CalcRef;
use crate::error::CompileResult;
use crate::query::Syntax;

/// Category of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Numeric,
    String,
    Boolean,
    /// Any scalar.
    Scalar,
    Member,
    Tuple,
    Set,
    Hierarchy,
    Level,
    Symbol,
}

impl ParamType {
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            ParamType::Numeric | ParamType::String | ParamType::Boolean | ParamType::Scalar
        )
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Numeric => "numeric",
            ParamType::String => "string",
            ParamType::Boolean => "boolean",
            ParamType::Scalar => "scalar",
            ParamType::Member => "member",
            ParamType::Tuple => "tuple",
            ParamType::Set => "set",
            ParamType::Hierarchy => "hierarchy",
            ParamType::Level => "level",
            ParamType::Symbol => "symbol",
        };
        f.write_str(s)
    }
}

/// Value substituted for an omitted optional argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultArg {
    /// Value of the current measure.
    CurrentMeasure,
    Number(f64),
}

/// Compiles one function from its already-converted arguments.
pub trait FunctionCompiler: Send + Sync {
    fn compile(
        &self,
        compiler: &Compiler<'_>,
        function: &str,
        args: Vec<CompiledArg>,
    ) -> CompileResult<CalcRef>;
}

/// Plain functions are the common strategy.
pub type CompileFn = fn(&Compiler<'_>, &str, Vec<CompiledArg>) -> CompileResult<CalcRef>;

impl FunctionCompiler for CompileFn {
    fn compile(
        &self,
        compiler: &Compiler<'_>,
        function: &str,
        args: Vec<CompiledArg>,
    ) -> CompileResult<CalcRef> {
        self(compiler, function, args)
    }
}

/// One registered signature.
#[derive(Clone)]
pub struct FunctionDef {
    pub name: String,
    pub syntax: Syntax,
    pub params: Vec<ParamType>,
    /// Number of leading parameters that must be supplied.
    pub required: usize,
    /// The last parameter repeats.
    pub variadic: bool,
    /// Substituted for the first omitted optional parameter.
    pub default: Option<DefaultArg>,
    pub compiler: Arc<dyn FunctionCompiler>,
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("signature", &self.signature())
            .field("syntax", &self.syntax)
            .finish()
    }
}

impl FunctionDef {
    /// A signature whose parameters are all required.
    pub fn new(
        name: &str,
        syntax: Syntax,
        params: &[ParamType],
        compiler: impl FunctionCompiler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            syntax,
            params: params.to_vec(),
            required: params.len(),
            variadic: false,
            default: None,
            compiler: Arc::new(compiler),
        }
    }

    /// Only the first `required` parameters must be supplied.
    pub fn optional(mut self, required: usize, default: Option<DefaultArg>) -> Self {
        self.required = required;
        self.default = default;
        self
    }

    /// The last parameter repeats; at least `required` arguments.
    pub fn variadic(mut self, required: usize) -> Self {
        self.variadic = true;
        self.required = required;
        self
    }

    pub fn accepts_count(&self, n: usize) -> bool {
        n >= self.required && (self.variadic || n <= self.params.len())
    }

    /// Declared type of argument `index`.
    pub fn param(&self, index: usize) -> Option<ParamType> {
        match self.params.get(index) {
            Some(p) => Some(*p),
            None if self.variadic => self.params.last().copied(),
            None => None,
        }
    }

    /// Accepted argument counts, for error messages.
    pub fn arity(&self) -> String {
        if self.variadic {
            format!("at least {}", self.required)
        } else if self.required == self.params.len() {
            self.required.to_string()
        } else {
            format!("{} to {}", self.required, self.params.len())
        }
    }

    /// e.g. `Avg(set[, numeric])`
    pub fn signature(&self) -> String {
        let mut out = format!("{}(", self.name);
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if i >= self.required {
                out.push('[');
            }
            out.push_str(&p.to_string());
            if i >= self.required {
                out.push(']');
            }
        }
        if self.variadic {
            out.push_str(", ...");
        }
        out.push(')');
        out
    }
}

/// Signatures keyed by (lower-cased name, syntax).
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<(String, Syntax), Vec<FunctionDef>>,
}

static STANDARD: Lazy<Arc<FunctionRegistry>> = Lazy::new(|| Arc::new(FunctionRegistry::builtin()));

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in function.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        builtins::register(&mut registry);
        registry
    }

    /// Shared instance of [`builtin`](Self::builtin).
    pub fn standard() -> Arc<FunctionRegistry> {
        Arc::clone(&STANDARD)
    }

    /// Add an overload. Earlier registrations win ties.
    pub fn register(&mut self, def: FunctionDef) {
        self.functions
            .entry((def.name.to_lowercase(), def.syntax))
            .or_default()
            .push(def);
    }

    pub fn lookup(&self, name: &str, syntax: Syntax) -> &[FunctionDef] {
        self.functions
            .get(&(name.to_lowercase(), syntax))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of registered overloads.
    pub fn len(&self) -> usize {
        self.functions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
