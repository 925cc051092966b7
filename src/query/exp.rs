use serde::{Deserialize, Serialize};

use crate::schema::{HierarchyId, MemberId};

/// How a function call was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    /// `Name(args)`
    Function,
    /// `arg.Name`
    Property,
    /// `arg.Name(args)`
    Method,
    /// `a op b`
    Infix,
    /// `op a`
    Prefix,
    /// `{a, b}`
    Braces,
    /// `(a, b)`
    Parentheses,
}

impl std::fmt::Display for Syntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Syntax::Function => "function",
            Syntax::Property => "property",
            Syntax::Method => "method",
            Syntax::Infix => "infix operator",
            Syntax::Prefix => "prefix operator",
            Syntax::Braces => "set constructor",
            Syntax::Parentheses => "tuple constructor",
        };
        f.write_str(s)
    }
}

/// A resolved query expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Exp {
    Number { value: f64 },
    String { value: String },
    Bool { value: bool },
    Null,
    Member { id: MemberId },
    Hierarchy { id: HierarchyId },
    Level { hierarchy: HierarchyId, depth: usize },
    /// Bare keyword argument such as `EXCLUDEEMPTY`.
    Symbol { name: String },
    Call {
        name: String,
        syntax: Syntax,
        args: Vec<Exp>,
    },
}

impl Exp {
    pub fn number(value: f64) -> Self {
        Exp::Number { value }
    }

    pub fn string(value: &str) -> Self {
        Exp::String {
            value: value.into(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Exp::Bool { value }
    }

    pub fn member(id: MemberId) -> Self {
        Exp::Member { id }
    }

    pub fn hierarchy(id: HierarchyId) -> Self {
        Exp::Hierarchy { id }
    }

    pub fn level(hierarchy: HierarchyId, depth: usize) -> Self {
        Exp::Level { hierarchy, depth }
    }

    pub fn symbol(name: &str) -> Self {
        Exp::Symbol { name: name.into() }
    }

    /// `Name(args)`
    pub fn call(name: &str, args: Vec<Exp>) -> Self {
        Self::with_syntax(name, Syntax::Function, args)
    }

    /// `target.Name`
    pub fn property(target: Exp, name: &str) -> Self {
        Self::with_syntax(name, Syntax::Property, vec![target])
    }

    /// `target.Name(args)`
    pub fn method(target: Exp, name: &str, args: Vec<Exp>) -> Self {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(target);
        all.extend(args);
        Self::with_syntax(name, Syntax::Method, all)
    }

    pub fn infix(op: &str, left: Exp, right: Exp) -> Self {
        Self::with_syntax(op, Syntax::Infix, vec![left, right])
    }

    pub fn prefix(op: &str, operand: Exp) -> Self {
        Self::with_syntax(op, Syntax::Prefix, vec![operand])
    }

    /// `{a, b, ...}`
    pub fn set(items: Vec<Exp>) -> Self {
        Self::with_syntax("{}", Syntax::Braces, items)
    }

    /// `(a, b, ...)`
    pub fn tuple(items: Vec<Exp>) -> Self {
        Self::with_syntax("()", Syntax::Parentheses, items)
    }

    pub fn with_syntax(name: &str, syntax: Syntax, args: Vec<Exp>) -> Self {
        Exp::Call {
            name: name.into(),
            syntax,
            args,
        }
    }

    /// Call `visit` for every member literal in this expression.
    pub fn visit_members(&self, visit: &mut impl FnMut(MemberId)) {
        match self {
            Exp::Member { id } => visit(*id),
            Exp::Call { args, .. } => {
                for arg in args {
                    arg.visit_members(visit);
                }
            }
            _ => {}
        }
    }
}
