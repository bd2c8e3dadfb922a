//! UPDATE statements.

use super::{assignments, table_ref};
use crate::error::MapResult;
use crate::transpiler::conditions::{render_keys, render_where};
use crate::transpiler::fields::{parameter_name, update_fields};
use crate::transpiler::{SqlDialect, StatementRequest, guards};

fn update_guards(dialect: &dyn SqlDialect, req: &StatementRequest) -> MapResult<()> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    guards::require_fields(req)
}

/// UPDATE by filter, or by the qualifier/primary key columns when no filter
/// is given.
pub fn build_update(dialect: &dyn SqlDialect, req: &StatementRequest) -> MapResult<String> {
    update_guards(dialect, req)?;
    let update = update_fields(req)?;

    let filter = if update.keys.is_empty() {
        let reserved = update
            .set
            .iter()
            .map(|f| parameter_name(f, None))
            .collect::<Vec<_>>();
        render_where(dialect, req.active_predicate(), &reserved)
    } else {
        format!(" WHERE {}", render_keys(dialect, &update.keys, None))
    };

    Ok(format!(
        "UPDATE {} SET {}{};",
        table_ref(dialect, req),
        assignments(dialect, &update.set, None),
        filter
    ))
}

/// One key-qualified UPDATE per row.
pub fn build_update_all(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    batch_size: i64,
) -> MapResult<String> {
    update_guards(dialect, req)?;
    guards::reject_predicate(req, "UpdateAll")?;
    let rows = guards::positive("batch_size", batch_size)?;
    let update = update_fields(req)?;
    guards::parameter_limit(dialect, batch_size, rows, update.set.len() + update.keys.len())?;

    let table = table_ref(dialect, req);
    Ok((0..rows as usize)
        .map(|i| {
            format!(
                "UPDATE {} SET {} WHERE {};",
                table,
                assignments(dialect, &update.set, Some(i)),
                render_keys(dialect, &update.keys, Some(i))
            )
        })
        .collect::<Vec<_>>()
        .join(" "))
}
