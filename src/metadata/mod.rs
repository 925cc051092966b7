//! Relational metadata listing.
//!
//! A [`MetadataSource`] lists the tables and views a connection can see.
//! Drivers differ in which relation types they accept as a filter, so
//! [`list_queryable_relations`] degrades to tables only when a driver
//! rejects the view filter.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sql::TableName;
use crate::statement::StatementResult;

/// Kind of relation a metadata source can list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Table,
    View,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Table => "TABLE",
            RelationKind::View => "VIEW",
        }
    }
}

/// A listed table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: TableName,
    pub kind: RelationKind,
}

/// Trait for listing relations.
pub trait MetadataSource: Send + Sync {
    /// List relations of the given kinds, optionally restricted to a
    /// catalog and schema.
    fn list_relations(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        kinds: &[RelationKind],
    ) -> StatementResult<Vec<Relation>>;
}

/// List tables and views, retrying with tables only if the first request
/// fails. Returns an empty list when both attempts fail.
pub fn list_queryable_relations(
    source: &dyn MetadataSource,
    catalog: Option<&str>,
    schema: Option<&str>,
) -> Vec<Relation> {
    match source.list_relations(catalog, schema, &[RelationKind::Table, RelationKind::View]) {
        Ok(relations) => relations,
        Err(err) => {
            warn!(error = %err, "listing tables and views failed, retrying with tables only");
            source
                .list_relations(catalog, schema, &[RelationKind::Table])
                .unwrap_or_else(|err| {
                    warn!(error = %err, "listing tables failed");
                    Vec::new()
                })
        }
    }
}

/// Whether a table or view with this name is visible.
///
/// Names compare case-insensitively, matching how most catalogs fold
/// unquoted identifiers.
pub fn table_exists(
    source: &dyn MetadataSource,
    catalog: Option<&str>,
    schema: Option<&str>,
    table: &str,
) -> bool {
    list_queryable_relations(source, catalog, schema)
        .iter()
        .any(|r| r.name.name.eq_ignore_ascii_case(table))
}
