//! DELETE and TRUNCATE statements.

use super::table_ref;
use crate::error::MapResult;
use crate::transpiler::conditions::{render_keys, render_where};
use crate::transpiler::fields::delete_keys;
use crate::transpiler::traits::quote_name;
use crate::transpiler::{SqlDialect, StatementRequest, guards};

/// DELETE by filter, or by the qualifier/primary key columns.
pub fn build_delete(dialect: &dyn SqlDialect, req: &StatementRequest) -> MapResult<String> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    let keys = delete_keys(req)?;
    let filter = if keys.is_empty() {
        render_where(dialect, req.active_predicate(), &[])
    } else {
        format!(" WHERE {}", render_keys(dialect, &keys, None))
    };
    Ok(format!("DELETE FROM {}{};", table_ref(dialect, req), filter))
}

/// DELETE of every row.
pub fn build_delete_all(dialect: &dyn SqlDialect, req: &StatementRequest) -> MapResult<String> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    guards::reject_predicate(req, "DeleteAll")?;
    Ok(format!("DELETE FROM {};", table_ref(dialect, req)))
}

/// `TRUNCATE TABLE t{suffix};`. Hints do not apply to TRUNCATE.
pub fn build_truncate(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    suffix: &str,
) -> MapResult<String> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    Ok(format!("TRUNCATE TABLE {}{};", quote_name(dialect, &req.table), suffix))
}

/// Dialects without TRUNCATE empty the table with a plain DELETE.
pub fn build_truncate_by_delete(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
) -> MapResult<String> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    Ok(format!("DELETE FROM {};", quote_name(dialect, &req.table)))
}
