use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    Hierarchy, HierarchyId, HierarchyRelation, Level, MeasureId, Member, MemberId, MemberKey,
    MemberKind,
};
use crate::query::Exp;
use crate::sql::TableName;

/// Errors raised while assembling a cube.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Unknown hierarchy: {0}")]
    UnknownHierarchy(HierarchyId),

    #[error("Hierarchy '{hierarchy}' has no level at depth {depth}")]
    MissingLevel { hierarchy: String, depth: usize },

    #[error("Parent {parent} does not belong to hierarchy '{hierarchy}'")]
    ForeignParent { hierarchy: String, parent: MemberId },

    #[error("Operation not allowed on the Measures hierarchy: {0}")]
    MeasuresHierarchy(String),

    #[error("Duplicate hierarchy name: {0}")]
    DuplicateHierarchy(String),

    #[error("Cube '{0}' defines no measures")]
    NoMeasures(String),
}

/// How a stored measure rolls up fact rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    Sum,
    Count,
    Min,
    Max,
    Avg,
    DistinctCount,
}

/// A measure backed by a fact column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub column: String,
    pub aggregator: Aggregator,
    #[serde(default)]
    pub format_string: Option<String>,
}

impl Measure {
    pub fn new(name: &str, column: &str, aggregator: Aggregator) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            aggregator,
            format_string: None,
        }
    }

    pub fn with_format(mut self, format_string: &str) -> Self {
        self.format_string = Some(format_string.into());
        self
    }
}

/// A cube: a fact table and the hierarchies that slice it.
#[derive(Debug, Clone)]
pub struct Cube {
    name: String,
    fact_table: TableName,
    hierarchies: Vec<Hierarchy>,
    measures: Vec<Measure>,
    unique_names: HashMap<String, MemberId>,
}

impl Cube {
    pub fn builder(name: &str, fact_table: TableName) -> CubeBuilder {
        CubeBuilder::new(name, fact_table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fact_table(&self) -> &TableName {
        &self.fact_table
    }

    pub fn hierarchies(&self) -> &[Hierarchy] {
        &self.hierarchies
    }

    pub fn hierarchy_ids(&self) -> impl Iterator<Item = HierarchyId> + '_ {
        self.hierarchies.iter().map(|h| h.id)
    }

    /// Look up a hierarchy. Ids come from this cube's builder, so a missing
    /// hierarchy is a caller bug.
    pub fn hierarchy(&self, id: HierarchyId) -> &Hierarchy {
        &self.hierarchies[id.index()]
    }

    pub fn hierarchy_by_name(&self, name: &str) -> Option<HierarchyId> {
        self.hierarchies
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.id)
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.hierarchies
            .get(id.hierarchy.index())
            .and_then(|h| h.member(id.ordinal))
    }

    pub fn member_by_unique_name(&self, unique_name: &str) -> Option<MemberId> {
        self.unique_names.get(unique_name).copied()
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn measure(&self, id: MeasureId) -> Option<&Measure> {
        self.measures.get(id.0 as usize)
    }

    /// Calculated members and their defining expressions.
    pub fn calculated_members(&self) -> impl Iterator<Item = (MemberId, &Exp)> + '_ {
        self.hierarchies.iter().flat_map(|h| {
            h.members.iter().filter_map(|m| match &m.kind {
                MemberKind::Calculated { expression, .. } => Some((m.id, expression)),
                _ => None,
            })
        })
    }

    /// Format string of a measure or calculated member.
    pub fn format_string(&self, member: MemberId) -> Option<&str> {
        match &self.member(member)?.kind {
            MemberKind::Measure(id) => self.measure(*id)?.format_string.as_deref(),
            MemberKind::Calculated { format_string, .. } => format_string.as_deref(),
            _ => None,
        }
    }

    /// Default member of every hierarchy, indexed by hierarchy.
    pub fn default_context(&self) -> Vec<MemberId> {
        self.hierarchies
            .iter()
            .map(|h| h.default_member.unwrap_or(MemberId::new(h.id, 0)))
            .collect()
    }
}

/// Assembles a [`Cube`], interning members as they are added.
#[derive(Debug)]
#[must_use = "builders have no effect until build() is called"]
pub struct CubeBuilder {
    name: String,
    fact_table: TableName,
    hierarchies: Vec<Hierarchy>,
    measures: Vec<Measure>,
}

impl CubeBuilder {
    pub fn new(name: &str, fact_table: TableName) -> Self {
        let mut measures = Hierarchy::new(
            HierarchyId::MEASURES,
            "Measures",
            HierarchyRelation::Measures,
        );
        measures.levels.push(Level {
            name: "MeasuresLevel".into(),
            depth: 0,
            column: None,
        });
        Self {
            name: name.into(),
            fact_table,
            hierarchies: vec![measures],
            measures: Vec::new(),
        }
    }

    /// Add a hierarchy with its `All` member.
    pub fn add_hierarchy(
        &mut self,
        name: &str,
        relation: HierarchyRelation,
    ) -> Result<HierarchyId, SchemaError> {
        if self
            .hierarchies
            .iter()
            .any(|h| h.name.eq_ignore_ascii_case(name))
        {
            return Err(SchemaError::DuplicateHierarchy(name.into()));
        }
        if relation == HierarchyRelation::Measures {
            return Err(SchemaError::MeasuresHierarchy(format!(
                "'{name}' cannot use the measures relation"
            )));
        }

        let id = HierarchyId(self.hierarchies.len() as u16);
        let mut hierarchy = Hierarchy::new(id, name, relation);
        hierarchy.levels.push(Level {
            name: "(All)".into(),
            depth: 0,
            column: None,
        });
        let all = MemberId::new(id, 0);
        hierarchy.members.push(Member {
            id: all,
            name: "All".into(),
            unique_name: format!("[{name}].[All]"),
            depth: 0,
            parent: None,
            children: Vec::new(),
            key: None,
            kind: MemberKind::All,
        });
        hierarchy.roots.push(all);
        hierarchy.default_member = Some(all);
        self.hierarchies.push(hierarchy);
        Ok(id)
    }

    /// Append the next level below the existing ones. Returns its depth.
    pub fn add_level(
        &mut self,
        hierarchy: HierarchyId,
        name: &str,
        column: &str,
    ) -> Result<usize, SchemaError> {
        self.push_level(hierarchy, name, Some(column.into()))
    }

    /// Append a level with no key column.
    ///
    /// Its members can be navigated and put on axes, but no SQL can select
    /// the fact rows under them: cell reads fail and drill-through is
    /// unsupported.
    pub fn add_level_without_column(
        &mut self,
        hierarchy: HierarchyId,
        name: &str,
    ) -> Result<usize, SchemaError> {
        self.push_level(hierarchy, name, None)
    }

    fn push_level(
        &mut self,
        hierarchy: HierarchyId,
        name: &str,
        column: Option<String>,
    ) -> Result<usize, SchemaError> {
        let h = self.regular_hierarchy(hierarchy)?;
        let depth = h.levels.len();
        h.levels.push(Level {
            name: name.into(),
            depth,
            column,
        });
        Ok(depth)
    }

    /// Intern a member under `parent` (`None` means directly below `All`).
    ///
    /// Adding the same name under the same parent returns the existing id.
    pub fn add_member(
        &mut self,
        hierarchy: HierarchyId,
        parent: Option<MemberId>,
        name: &str,
        key: impl Into<MemberKey>,
    ) -> Result<MemberId, SchemaError> {
        let h = self.regular_hierarchy(hierarchy)?;
        let parent = parent.unwrap_or(MemberId::new(hierarchy, 0));
        let parent_member = match h.member(parent.ordinal) {
            Some(p) if parent.hierarchy == hierarchy => p,
            _ => {
                return Err(SchemaError::ForeignParent {
                    hierarchy: h.name.clone(),
                    parent,
                })
            }
        };

        let intern_key = (Some(parent.ordinal), name.to_string());
        if let Some(ordinal) = h.interned.get(&intern_key) {
            return Ok(MemberId::new(hierarchy, *ordinal));
        }

        let depth = parent_member.depth + 1;
        if h.levels.len() <= depth {
            return Err(SchemaError::MissingLevel {
                hierarchy: h.name.clone(),
                depth,
            });
        }
        let unique_name = format!("{}.[{}]", parent_unique_prefix(parent_member, &h.name), name);

        let id = MemberId::new(hierarchy, h.members.len() as u32);
        h.members.push(Member {
            id,
            name: name.into(),
            unique_name,
            depth,
            parent: Some(parent),
            children: Vec::new(),
            key: Some(key.into()),
            kind: MemberKind::Regular,
        });
        h.members[parent.ordinal as usize].children.push(id);
        h.interned.insert(intern_key, id.ordinal);
        Ok(id)
    }

    /// Add a stored measure. The first measure becomes the default.
    pub fn add_measure(&mut self, measure: Measure) -> MemberId {
        let measure_id = MeasureId(self.measures.len() as u32);
        let name = measure.name.clone();
        self.measures.push(measure);
        self.push_measures_member(&name, MemberKind::Measure(measure_id))
    }

    /// Add a calculated measure defined by `expression`.
    pub fn add_calculated_member(
        &mut self,
        name: &str,
        expression: Exp,
        format_string: Option<&str>,
    ) -> MemberId {
        self.push_measures_member(
            name,
            MemberKind::Calculated {
                expression,
                format_string: format_string.map(String::from),
            },
        )
    }

    pub fn build(self) -> Result<Cube, SchemaError> {
        let measures = &self.hierarchies[HierarchyId::MEASURES.index()];
        if measures.members.is_empty() {
            return Err(SchemaError::NoMeasures(self.name));
        }

        let unique_names = self
            .hierarchies
            .iter()
            .flat_map(|h| h.members.iter().map(|m| (m.unique_name.clone(), m.id)))
            .collect();

        Ok(Cube {
            name: self.name,
            fact_table: self.fact_table,
            hierarchies: self.hierarchies,
            measures: self.measures,
            unique_names,
        })
    }

    fn push_measures_member(&mut self, name: &str, kind: MemberKind) -> MemberId {
        let h = &mut self.hierarchies[HierarchyId::MEASURES.index()];
        let intern_key = (None, name.to_string());
        if let Some(ordinal) = h.interned.get(&intern_key) {
            let id = MemberId::new(HierarchyId::MEASURES, *ordinal);
            h.members[*ordinal as usize].kind = kind;
            return id;
        }

        let id = MemberId::new(HierarchyId::MEASURES, h.members.len() as u32);
        h.members.push(Member {
            id,
            name: name.into(),
            unique_name: format!("[Measures].[{name}]"),
            depth: 0,
            parent: None,
            children: Vec::new(),
            key: None,
            kind,
        });
        h.roots.push(id);
        h.interned.insert(intern_key, id.ordinal);

        let is_stored = matches!(h.members[id.ordinal as usize].kind, MemberKind::Measure(_));
        let has_stored_default = h
            .default_member
            .and_then(|d| h.member(d.ordinal))
            .is_some_and(|d| d.measure().is_some());
        if h.default_member.is_none() || (is_stored && !has_stored_default) {
            h.default_member = Some(id);
        }
        id
    }

    fn regular_hierarchy(&mut self, id: HierarchyId) -> Result<&mut Hierarchy, SchemaError> {
        if id == HierarchyId::MEASURES {
            return Err(SchemaError::MeasuresHierarchy(
                "levels and members are added with add_measure".into(),
            ));
        }
        self.hierarchies
            .get_mut(id.index())
            .ok_or(SchemaError::UnknownHierarchy(id))
    }
}

/// Unique-name prefix for children of `parent`: the `All` member is left
/// out so `[Time].[1997]` rather than `[Time].[All].[1997]`.
fn parent_unique_prefix(parent: &Member, hierarchy: &str) -> String {
    if parent.is_all() {
        format!("[{hierarchy}]")
    } else {
        parent.unique_name.clone()
    }
}
