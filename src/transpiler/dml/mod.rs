//! Statement assembly shared by the dialects.
//!
//! Dialect implementations call these functions explicitly and pass their
//! own variation points (row limiting style, key retrieval, upsert form).

pub mod delete;
pub mod insert;
pub mod select;
pub mod update;
pub mod upsert;

use super::fields::parameter_name;
use super::traits::quote_name;
use super::{OrderField, SortOrder, SqlDialect, StatementRequest};
use crate::schema::DbField;

/// Alias of the returned key column.
pub const RESULT_ALIAS: &str = "Result";
/// Alias of the row index returned next to a batch key.
pub const ORDER_ALIAS: &str = "OrderColumn";
/// Injected source column carrying the row index of a batch.
pub const ORDER_COLUMN: &str = "__OrderColumn";

/// How a statement reads the generated key back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRetrieval {
    /// `OUTPUT INSERTED.[k] AS [Result]`.
    Output,
    /// `RETURNING "k" AS "Result"` at the end of the statement.
    Returning,
    /// Second statement selecting this function when the key is an
    /// identity, or the key parameter when the key is supplied.
    Select(&'static str),
}

/// Quoted table name plus the hint clause, if any.
pub fn table_ref(dialect: &dyn SqlDialect, req: &StatementRequest) -> String {
    let table = quote_name(dialect, &req.table);
    match req.hints.as_deref().map(str::trim) {
        Some(hints) if !hints.is_empty() && dialect.supports_hints() => {
            format!("{}{}", table, dialect.hint_clause(hints))
        }
        _ => table,
    }
}

pub fn column_list(dialect: &dyn SqlDialect, fields: &[&DbField]) -> String {
    fields
        .iter()
        .map(|f| dialect.quote_identifier(f.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every requested column of a query.
pub fn select_list(dialect: &dyn SqlDialect, req: &StatementRequest) -> String {
    column_list(dialect, &req.fields.iter().collect::<Vec<_>>())
}

pub fn parameter_list(dialect: &dyn SqlDialect, fields: &[&DbField], row: Option<usize>) -> String {
    fields
        .iter()
        .map(|f| dialect.parameter(&parameter_name(f, row)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `[a] = @a, [b] = @b`.
pub fn assignments(dialect: &dyn SqlDialect, fields: &[&DbField], row: Option<usize>) -> String {
    fields
        .iter()
        .map(|f| {
            format!(
                "{} = {}",
                dialect.quote_identifier(f.name()),
                dialect.parameter(&parameter_name(f, row))
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `[Id] ASC, [Name] DESC` (no keyword).
pub fn order_list(dialect: &dyn SqlDialect, order: &[OrderField]) -> String {
    order
        .iter()
        .map(|o| {
            let direction = match o.order {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };
            format!("{} {}", quote_name(dialect, &o.name), direction)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// ` ORDER BY ...`, or empty.
pub fn order_clause(dialect: &dyn SqlDialect, order: &[OrderField]) -> String {
    if order.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", order_list(dialect, order))
    }
}

/// `, 3 AS [OrderColumn]` for batch rows.
pub fn order_value(dialect: &dyn SqlDialect, row: Option<usize>) -> String {
    match row {
        Some(i) => format!(", {} AS {}", i, dialect.quote_identifier(ORDER_ALIAS)),
        None => String::new(),
    }
}

/// Value selected by a trailing key statement: `function` when the
/// database generates the key, the key parameter when it is supplied.
pub fn trailing_key(
    dialect: &dyn SqlDialect,
    key: &DbField,
    inputs: &[&DbField],
    function: &'static str,
    row: Option<usize>,
) -> Option<String> {
    if key.is_identity() {
        Some(function.to_string())
    } else if inputs.iter().any(|f| f.is_named(key.name())) {
        Some(dialect.parameter(&parameter_name(key, row)))
    } else {
        None
    }
}

/// `; SELECT x AS [Result]` completed by the row's order value.
pub fn select_key(dialect: &dyn SqlDialect, value: &str, row: Option<usize>) -> String {
    format!(
        " SELECT {} AS {}{};",
        value,
        dialect.quote_identifier(RESULT_ALIAS),
        order_value(dialect, row)
    )
}

/// ` RETURNING "k" AS "Result"` completed by the row's order value.
pub fn returning_key(dialect: &dyn SqlDialect, key: &DbField, row: Option<usize>) -> String {
    format!(
        " RETURNING {} AS {}{}",
        dialect.quote_identifier(key.name()),
        dialect.quote_identifier(RESULT_ALIAS),
        order_value(dialect, row)
    )
}

/// `OUTPUT INSERTED.[k] AS [Result]`, with the source order column in batches.
pub fn output_key(dialect: &dyn SqlDialect, key: &DbField, batch: bool) -> String {
    let mut clause = format!(
        " OUTPUT INSERTED.{} AS {}",
        dialect.quote_identifier(key.name()),
        dialect.quote_identifier(RESULT_ALIAS)
    );
    if batch {
        clause.push_str(&format!(
            ", S.{} AS {}",
            dialect.quote_identifier(ORDER_COLUMN),
            dialect.quote_identifier(ORDER_ALIAS)
        ));
    }
    clause
}

/// `(@a_0, @b_0, 0), (@a_1, @b_1, 1)` rows of a batch source.
pub fn values_rows(dialect: &dyn SqlDialect, fields: &[&DbField], rows: usize) -> String {
    (0..rows)
        .map(|i| format!("({}, {})", parameter_list(dialect, fields, Some(i)), i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `S.[a], S.[b]`.
pub fn source_list(dialect: &dyn SqlDialect, fields: &[&DbField]) -> String {
    fields
        .iter()
        .map(|f| format!("S.{}", dialect.quote_identifier(f.name())))
        .collect::<Vec<_>>()
        .join(", ")
}
