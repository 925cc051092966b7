//! Star-join SQL shared by cell reads and drill-through.

use crate::error::{EvalError, EvalResult};
use crate::schema::{Cube, HierarchyRelation, MemberId};
use crate::sql::{table_col, Expr, ExprExt, Query, SqlDialect};

/// FROM, joins and WHERE selecting the fact rows under `coordinate`.
///
/// `All` members add no constraint. When `free` is given, that member's own
/// level is left unconstrained (its ancestors still are) and the level's key
/// column is returned so the caller can group by it.
pub fn star_query(
    cube: &Cube,
    coordinate: &[MemberId],
    free: Option<MemberId>,
) -> EvalResult<(Query, Option<Expr>)> {
    let fact = cube.fact_table();
    let mut query = Query::new().from(fact.clone());
    let mut free_column = None;

    for &member_id in coordinate {
        let hierarchy = cube.hierarchy(member_id.hierarchy);
        if hierarchy.is_measures() {
            continue;
        }
        let path = hierarchy.path(member_id);
        if path.is_empty() {
            continue;
        }

        let table = match hierarchy.relation() {
            HierarchyRelation::Table {
                table,
                primary_key,
                foreign_key,
            } => {
                query = query.inner_join(
                    table.clone(),
                    table_col(&fact.name, foreign_key).eq(table_col(&table.name, primary_key)),
                );
                table.name.as_str()
            }
            _ => fact.name.as_str(),
        };

        let is_free = free == Some(member_id);
        let constrained = if is_free {
            &path[..path.len() - 1]
        } else {
            &path[..]
        };
        for member in constrained {
            let key = member.key.as_ref().ok_or_else(|| {
                EvalError::Type(format!("member {} has no key", member.unique_name))
            })?;
            let column = level_column(cube, member_id, member.depth)?;
            query = query.filter(table_col(table, column).eq(key.to_expr()));
        }
        if is_free {
            free_column = Some(table_col(table, level_column(cube, member_id, path.len())?));
        }
    }

    Ok((query, free_column))
}

fn level_column(cube: &Cube, member: MemberId, depth: usize) -> EvalResult<&str> {
    let hierarchy = cube.hierarchy(member.hierarchy);
    hierarchy
        .level(depth)
        .and_then(|l| l.column.as_deref())
        .ok_or_else(|| {
            EvalError::Type(format!(
                "hierarchy '{}' has no key column at depth {depth}",
                hierarchy.name()
            ))
        })
}

/// Detail rows of the fact table under `coordinate`, capped at `max_rows`.
pub fn drill_through_sql(
    cube: &Cube,
    dialect: &dyn SqlDialect,
    coordinate: &[MemberId],
    max_rows: u64,
) -> EvalResult<String> {
    let (query, _) = star_query(cube, coordinate, None)?;
    Ok(query
        .select(vec![Expr::Star {
            table: Some(cube.fact_table().name.clone()),
        }])
        .limit(max_rows)
        .to_sql(dialect))
}
