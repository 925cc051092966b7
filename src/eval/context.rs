//! The current coordinate and its savepoint stack.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::calc::HierarchySet;
use crate::error::SavepointDisciplineError;
use crate::schema::{HierarchyId, MemberId};

/// Token returned by [`Context::savepoint`].
///
/// Consumed by [`Context::restore`], so a savepoint cannot be restored twice.
/// Only the context that issued it accepts it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a savepoint must be restored"]
pub struct Savepoint {
    context: u64,
    serial: u64,
}

impl Savepoint {
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Id of the issuing context.
    pub fn context(&self) -> u64 {
        self.context
    }
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Context members restricted to a set of hierarchies, in hierarchy order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<(HierarchyId, MemberId)>);

impl Fingerprint {
    pub fn entries(&self) -> &[(HierarchyId, MemberId)] {
        &self.0
    }
}

/// One current member per hierarchy.
///
/// Mutations made while a savepoint is active are logged as
/// `(hierarchy, previous member)` so restoring only touches what changed.
#[derive(Debug)]
pub struct Context {
    id: u64,
    members: Vec<MemberId>,
    undo: Vec<(HierarchyId, MemberId)>,
    savepoints: Vec<(u64, usize)>,
    next_serial: u64,
}

impl Context {
    /// A context positioned on `members`, one per hierarchy in order.
    pub fn new(members: Vec<MemberId>) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            members,
            undo: Vec::new(),
            savepoints: Vec::new(),
            next_serial: 0,
        }
    }

    /// Process-unique id, stamped on every savepoint this context issues.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn member(&self, hierarchy: HierarchyId) -> MemberId {
        self.members[hierarchy.index()]
    }

    pub fn members(&self) -> &[MemberId] {
        &self.members
    }

    /// Select `member` on its hierarchy.
    pub fn set_member(&mut self, member: MemberId) {
        let slot = &mut self.members[member.hierarchy.index()];
        if *slot == member {
            return;
        }
        if !self.savepoints.is_empty() {
            self.undo.push((member.hierarchy, *slot));
        }
        *slot = member;
    }

    pub fn set_tuple(&mut self, tuple: &[MemberId]) {
        for member in tuple {
            self.set_member(*member);
        }
    }

    pub fn savepoint(&mut self) -> Savepoint {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.savepoints.push((serial, self.undo.len()));
        Savepoint {
            context: self.id,
            serial,
        }
    }

    /// Undo every mutation made since `savepoint`.
    ///
    /// # Panics
    ///
    /// With a [`SavepointDisciplineError`] if `savepoint` was issued by
    /// another context or is not the most recent active one.
    pub fn restore(&mut self, savepoint: Savepoint) {
        if savepoint.context != self.id {
            panic!(
                "{}",
                SavepointDisciplineError::ForeignContext {
                    serial: savepoint.serial,
                    owner: savepoint.context,
                    context: self.id,
                }
            );
        }
        match self.savepoints.last().copied() {
            Some((serial, mark)) if serial == savepoint.serial => {
                while self.undo.len() > mark {
                    if let Some((hierarchy, previous)) = self.undo.pop() {
                        self.members[hierarchy.index()] = previous;
                    }
                }
                self.savepoints.pop();
            }
            top => panic!(
                "{}",
                SavepointDisciplineError::OutOfOrder {
                    serial: savepoint.serial,
                    active: top.map(|(serial, _)| serial),
                }
            ),
        }
    }

    /// Number of active savepoints.
    pub fn depth(&self) -> usize {
        self.savepoints.len()
    }

    /// Current members of `dependencies`, sorted by hierarchy.
    pub fn fingerprint(&self, dependencies: &HierarchySet) -> Fingerprint {
        Fingerprint(
            dependencies
                .iter()
                .map(|h| (h, self.members[h.index()]))
                .collect(),
        )
    }
}
