use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{HierarchyId, Member, MemberId};
use crate::sql::TableName;

/// How a hierarchy's level columns are reached from the fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyRelation {
    /// The measures hierarchy has no columns.
    Measures,
    /// Degenerate dimension: level columns live in the fact table.
    Fact,
    /// Dimension table joined on `fact.foreign_key = table.primary_key`.
    Table {
        table: TableName,
        primary_key: String,
        foreign_key: String,
    },
}

/// A level of a hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    pub depth: usize,
    /// Key column; `None` for the `(All)` and measures levels and for levels
    /// added without one.
    pub column: Option<String>,
}

/// An ordered tree of interned members.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    pub(super) id: HierarchyId,
    pub(super) name: String,
    pub(super) levels: Vec<Level>,
    pub(super) members: Vec<Member>,
    pub(super) roots: Vec<MemberId>,
    pub(super) default_member: Option<MemberId>,
    pub(super) relation: HierarchyRelation,
    pub(super) interned: HashMap<(Option<u32>, String), u32>,
}

impl Hierarchy {
    pub(super) fn new(id: HierarchyId, name: &str, relation: HierarchyRelation) -> Self {
        Self {
            id,
            name: name.into(),
            levels: Vec::new(),
            members: Vec::new(),
            roots: Vec::new(),
            default_member: None,
            relation,
            interned: HashMap::new(),
        }
    }

    pub fn id(&self) -> HierarchyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_measures(&self) -> bool {
        self.id == HierarchyId::MEASURES
    }

    pub fn relation(&self) -> &HierarchyRelation {
        &self.relation
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, depth: usize) -> Option<&Level> {
        self.levels.get(depth)
    }

    pub fn level_by_name(&self, name: &str) -> Option<&Level> {
        self.levels
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub fn member(&self, ordinal: u32) -> Option<&Member> {
        self.members.get(ordinal as usize)
    }

    /// Members in insertion order.
    pub fn all_members(&self) -> &[Member] {
        &self.members
    }

    /// The `All` member, absent on the measures hierarchy.
    pub fn all_member(&self) -> Option<MemberId> {
        self.members.first().filter(|m| m.is_all()).map(|m| m.id)
    }

    /// Member selected when a query says nothing about this hierarchy.
    pub fn default_member(&self) -> Option<MemberId> {
        self.default_member
    }

    /// Top-level members in declaration order.
    pub fn roots(&self) -> &[MemberId] {
        &self.roots
    }

    /// Every member in hierarchical (pre-order) order.
    pub fn members(&self) -> Vec<MemberId> {
        let mut out = Vec::with_capacity(self.members.len());
        for root in &self.roots {
            self.walk(*root, &mut |m| out.push(m.id));
        }
        out
    }

    /// Members of one level in hierarchical order.
    pub fn members_at(&self, depth: usize) -> Vec<MemberId> {
        let mut out = Vec::new();
        for root in &self.roots {
            self.walk(*root, &mut |m| {
                if m.depth == depth {
                    out.push(m.id)
                }
            });
        }
        out
    }

    /// Descendants of `ancestor` at `depth`, in hierarchical order.
    pub fn descendants_at(&self, ancestor: MemberId, depth: usize) -> Vec<MemberId> {
        let mut out = Vec::new();
        self.walk(ancestor, &mut |m| {
            if m.depth == depth {
                out.push(m.id)
            }
        });
        out
    }

    /// Resolve a member by its names below `All`, e.g. `["1997", "Q1"]`.
    pub fn lookup(&self, path: &[&str]) -> Option<MemberId> {
        let mut parent = self.all_member().map(|m| m.ordinal);
        let mut found = None;
        for name in path {
            let ordinal = *self.interned.get(&(parent, (*name).to_string()))?;
            parent = Some(ordinal);
            found = Some(MemberId::new(self.id, ordinal));
        }
        found
    }

    /// Members sharing `member`'s parent, including itself.
    pub fn siblings(&self, member: MemberId) -> Vec<MemberId> {
        match self.member(member.ordinal).and_then(|m| m.parent) {
            Some(parent) => self
                .member(parent.ordinal)
                .map(|p| p.children.clone())
                .unwrap_or_default(),
            None => self.roots.clone(),
        }
    }

    /// Ancestors from the shallowest non-`All` member down to `member`.
    pub fn path(&self, member: MemberId) -> Vec<&Member> {
        let mut path = Vec::new();
        let mut current = self.member(member.ordinal);
        while let Some(m) = current {
            if m.is_all() {
                break;
            }
            path.push(m);
            current = m.parent.and_then(|p| self.member(p.ordinal));
        }
        path.reverse();
        path
    }

    fn walk<'a>(&'a self, id: MemberId, visit: &mut impl FnMut(&'a Member)) {
        if let Some(member) = self.member(id.ordinal) {
            visit(member);
            for child in &member.children {
                self.walk(*child, visit);
            }
        }
    }
}
