//! Argument checks shared by every dialect.
//!
//! Guards run before any text is assembled, so a failing request never
//! yields partial SQL.

use super::{SqlDialect, StatementRequest};
use crate::error::{MapError, MapResult};

pub fn require_table(req: &StatementRequest) -> MapResult<()> {
    if req.table.trim().is_empty() {
        return Err(MapError::argument("table name is required"));
    }
    Ok(())
}

/// Reject hints on dialects without hint support.
pub fn check_hints(dialect: &dyn SqlDialect, req: &StatementRequest) -> MapResult<()> {
    match req.hints.as_deref() {
        Some(hints) if !hints.trim().is_empty() && !dialect.supports_hints() => Err(
            MapError::unsupported(format!("{} does not support table hints", dialect.name())),
        ),
        _ => Ok(()),
    }
}

pub fn require_fields(req: &StatementRequest) -> MapResult<()> {
    if req.fields.is_empty() {
        return Err(MapError::argument(format!(
            "field list is required for table '{}'",
            req.table
        )));
    }
    Ok(())
}

pub fn require_order(req: &StatementRequest) -> MapResult<()> {
    if req.order_by.is_empty() {
        return Err(MapError::argument(format!(
            "ORDER BY is required for a paged query on table '{}'",
            req.table
        )));
    }
    Ok(())
}

/// Batch operations bind rows, never a filter.
pub fn reject_predicate(req: &StatementRequest, operation: &str) -> MapResult<()> {
    if req.active_predicate().is_some() {
        return Err(MapError::argument(format!(
            "{} on table '{}' does not accept a filter",
            operation, req.table
        )));
    }
    Ok(())
}

pub fn non_negative(name: &'static str, value: i64) -> MapResult<u64> {
    u64::try_from(value).map_err(|_| MapError::range(name, value))
}

pub fn positive(name: &'static str, value: i64) -> MapResult<u64> {
    match u64::try_from(value) {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(MapError::range(name, value)),
    }
}

/// `rows × per_row` parameters must fit the dialect's limit.
pub fn parameter_limit(
    dialect: &dyn SqlDialect,
    batch_size: i64,
    rows: u64,
    per_row: usize,
) -> MapResult<()> {
    let total = rows.saturating_mul(per_row as u64);
    if total > dialect.max_parameters() as u64 {
        return Err(MapError::range("batch_size", batch_size));
    }
    Ok(())
}

/// Insert and merge must carry a primary key the database cannot fill in.
pub fn require_primary(req: &StatementRequest) -> MapResult<()> {
    let Some(primary) = super::fields::primary(req) else {
        return Ok(());
    };
    let fillable = primary.is_read_only() || primary.has_default_value();
    let present = req.fields.iter().any(|f| f.is_named(primary.name()));
    if !fillable && !present {
        return Err(MapError::PrimaryFieldMissing {
            table: req.table.clone(),
            field: primary.name().to_string(),
        });
    }
    Ok(())
}
