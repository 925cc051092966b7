//! In-memory cube metadata.
//!
//! The engine consumes a cube that has already been resolved from whatever
//! schema format the deployment uses. Members are interned per hierarchy and
//! addressed by [`MemberId`], so two lookups of the same member always yield
//! the same identity.
//!
//! Hierarchy 0 is always `Measures`. Every other hierarchy has an `All`
//! member at depth 0 and its levels start at depth 1.

mod cube;
mod hierarchy;
mod member;

pub use cube::{Aggregator, Cube, CubeBuilder, Measure, SchemaError};
pub use hierarchy::{Hierarchy, HierarchyRelation, Level};
pub use member::{Member, MemberKey, MemberKind};

use serde::{Deserialize, Serialize};

/// Position of a hierarchy within its cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HierarchyId(pub u16);

impl HierarchyId {
    pub const MEASURES: HierarchyId = HierarchyId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for HierarchyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Interned member identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId {
    pub hierarchy: HierarchyId,
    pub ordinal: u32,
}

impl MemberId {
    pub fn new(hierarchy: HierarchyId, ordinal: u32) -> Self {
        Self {
            hierarchy,
            ordinal,
        }
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.hierarchy, self.ordinal)
    }
}

/// Index into the cube's stored measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasureId(pub u32);
