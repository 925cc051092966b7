//! Validated query model.
//!
//! Queries arrive already parsed and resolved: member references are
//! [`MemberId`]s, not names. The engine never sees query text.

mod exp;

pub use exp::{Exp, Syntax};

use serde::{Deserialize, Serialize};

use crate::schema::{Cube, HierarchyId, MemberId};

/// One axis of the result grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAxis {
    pub set: Exp,
    /// Drop positions whose cells are all empty.
    #[serde(default)]
    pub non_empty: bool,
}

/// A multidimensional query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[must_use = "Query has no effect until executed"]
pub struct Query {
    pub axes: Vec<QueryAxis>,
    /// Cell expression; the current measure when absent.
    pub slicer: Option<Exp>,
    /// Members fixed in the base context before any axis is evaluated.
    #[serde(default)]
    pub filter: Vec<MemberId>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an axis.
    pub fn axis(mut self, set: Exp) -> Self {
        self.axes.push(QueryAxis {
            set,
            non_empty: false,
        });
        self
    }

    /// Append an axis that suppresses empty positions.
    pub fn non_empty_axis(mut self, set: Exp) -> Self {
        self.axes.push(QueryAxis {
            set,
            non_empty: true,
        });
        self
    }

    pub fn slicer(mut self, exp: Exp) -> Self {
        self.slicer = Some(exp);
        self
    }

    pub fn filter(mut self, members: Vec<MemberId>) -> Self {
        self.filter = members;
        self
    }

    /// Measures referenced anywhere in the query, in first-seen order.
    pub fn measures(&self, cube: &Cube) -> Vec<MemberId> {
        let mut out = Vec::new();
        let mut push = |m: MemberId| {
            if m.hierarchy == HierarchyId::MEASURES && cube.member(m).is_some() && !out.contains(&m)
            {
                out.push(m);
            }
        };
        for axis in &self.axes {
            axis.set.visit_members(&mut push);
        }
        if let Some(slicer) = &self.slicer {
            slicer.visit_members(&mut push);
        }
        for m in &self.filter {
            push(*m);
        }
        out
    }
}
