use serde::{Deserialize, Serialize};

use super::{MeasureId, MemberId};
use crate::query::Exp;
use crate::sql::{lit_int, lit_str, Expr};
use crate::statement::SqlValue;

/// Value identifying a member in its level's key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberKey {
    Int(i64),
    Str(String),
}

impl MemberKey {
    /// SQL literal for comparisons against the level column.
    pub fn to_expr(&self) -> Expr {
        match self {
            MemberKey::Int(n) => lit_int(*n),
            MemberKey::Str(s) => lit_str(s),
        }
    }

    /// Whether a value read back from the database is this key.
    pub fn matches(&self, value: &SqlValue) -> bool {
        match (self, value) {
            (MemberKey::Int(k), SqlValue::Int(v)) => k == v,
            (MemberKey::Int(k), SqlValue::Float(v)) => (*k as f64) == *v,
            (MemberKey::Int(k), SqlValue::Text(v)) => v.parse::<i64>().ok() == Some(*k),
            (MemberKey::Str(k), SqlValue::Text(v)) => k == v,
            (MemberKey::Str(k), SqlValue::Int(v)) => k.parse::<i64>().ok() == Some(*v),
            _ => false,
        }
    }
}

impl From<i64> for MemberKey {
    fn from(n: i64) -> Self {
        MemberKey::Int(n)
    }
}

impl From<i32> for MemberKey {
    fn from(n: i32) -> Self {
        MemberKey::Int(n as i64)
    }
}

impl From<&str> for MemberKey {
    fn from(s: &str) -> Self {
        MemberKey::Str(s.into())
    }
}

impl From<String> for MemberKey {
    fn from(s: String) -> Self {
        MemberKey::Str(s)
    }
}

/// What a member stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberKind {
    /// Root of a non-measures hierarchy; imposes no constraint.
    All,
    Regular,
    /// Stored measure.
    Measure(MeasureId),
    /// Measure defined by an expression over other members.
    Calculated {
        expression: Exp,
        format_string: Option<String>,
    },
}

/// A node in a hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    /// `[Hierarchy].[a].[b]`
    pub unique_name: String,
    pub depth: usize,
    pub parent: Option<MemberId>,
    pub children: Vec<MemberId>,
    pub key: Option<MemberKey>,
    pub kind: MemberKind,
}

impl Member {
    pub fn is_all(&self) -> bool {
        matches!(self.kind, MemberKind::All)
    }

    pub fn is_calculated(&self) -> bool {
        matches!(self.kind, MemberKind::Calculated { .. })
    }

    pub fn measure(&self) -> Option<MeasureId> {
        match self.kind {
            MemberKind::Measure(id) => Some(id),
            _ => None,
        }
    }
}
