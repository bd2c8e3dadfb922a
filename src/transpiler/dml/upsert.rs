//! Upserts: MERGE, ON CONFLICT, ON DUPLICATE KEY and INSERT OR REPLACE.

use super::{
    KeyRetrieval, ORDER_COLUMN, RESULT_ALIAS, assignments, column_list, order_value, output_key,
    parameter_list, returning_key, select_key, source_list, table_ref, trailing_key, values_rows,
};
use crate::error::{MapError, MapResult};
use crate::schema::DbField;
use crate::transpiler::conditions::render_keys;
use crate::transpiler::fields::{MergeFields, key_column, merge_fields, parameter_name, schema};
use crate::transpiler::{SqlDialect, StatementRequest, guards};

fn merge_guards<'a>(
    dialect: &dyn SqlDialect,
    req: &'a StatementRequest,
) -> MapResult<MergeFields<'a>> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    guards::require_fields(req)?;
    guards::require_primary(req)?;
    merge_fields(req)
}

fn batch_guards<'a>(
    dialect: &dyn SqlDialect,
    req: &'a StatementRequest,
    batch_size: i64,
) -> MapResult<(MergeFields<'a>, usize)> {
    let merge = merge_guards(dialect, req)?;
    guards::reject_predicate(req, "MergeAll")?;
    let rows = guards::positive("batch_size", batch_size)?;
    guards::parameter_limit(dialect, batch_size, rows, merge.inputs.len())?;
    Ok((merge, rows as usize))
}

/// Run `row` once, or once per batch row joined into one command.
fn each_row(batch: Option<usize>, row: impl Fn(Option<usize>) -> String) -> String {
    match batch {
        None => row(None),
        Some(n) => (0..n).map(|i| row(Some(i))).collect::<Vec<_>>().join(" "),
    }
}

/// Bound values of an insert branch. An identity of zero, the key of an
/// unsaved entity, becomes NULL so the database generates it.
fn insert_values(dialect: &dyn SqlDialect, inputs: &[&DbField], row: Option<usize>) -> String {
    inputs
        .iter()
        .map(|f| {
            let parameter = dialect.parameter(&parameter_name(f, row));
            if f.is_identity() {
                format!("NULLIF({}, 0)", parameter)
            } else {
                parameter
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// MERGE (SQL Server)

pub fn build_merge_statement(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
) -> MapResult<String> {
    let merge = merge_guards(dialect, req)?;
    Ok(merge_statement(dialect, req, &merge, None))
}

/// Batch MERGE over a `VALUES` source; the row index travels in
/// `__OrderColumn` and comes back next to each key.
pub fn build_merge_statement_all(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    batch_size: i64,
) -> MapResult<String> {
    let (merge, rows) = batch_guards(dialect, req, batch_size)?;
    Ok(merge_statement(dialect, req, &merge, Some(rows)))
}

fn merge_statement(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    merge: &MergeFields<'_>,
    batch: Option<usize>,
) -> String {
    let source = match batch {
        None => {
            let columns = merge
                .inputs
                .iter()
                .map(|f| {
                    format!(
                        "{} AS {}",
                        dialect.parameter(&parameter_name(f, None)),
                        dialect.quote_identifier(f.name())
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("(SELECT {}) AS S", columns)
        }
        Some(n) => format!(
            "(VALUES {}) AS S ({}, {})",
            values_rows(dialect, &merge.inputs, n),
            column_list(dialect, &merge.inputs),
            dialect.quote_identifier(ORDER_COLUMN)
        ),
    };

    let on = merge
        .keys
        .iter()
        .map(|k| {
            let column = dialect.quote_identifier(k.name());
            format!("S.{} = T.{}", column, column)
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    let insert = if merge.writable.is_empty() {
        "INSERT DEFAULT VALUES".to_string()
    } else {
        format!(
            "INSERT ({}) VALUES ({})",
            column_list(dialect, &merge.writable),
            source_list(dialect, &merge.writable)
        )
    };

    let matched = if merge.set.is_empty() {
        String::new()
    } else {
        let set = merge
            .set
            .iter()
            .map(|f| {
                let column = dialect.quote_identifier(f.name());
                format!("T.{} = S.{}", column, column)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(" WHEN MATCHED THEN UPDATE SET {}", set)
    };

    let output = key_column(req)
        .map(|k| output_key(dialect, k, batch.is_some()))
        .unwrap_or_default();

    format!(
        "MERGE {} AS T USING {} ON ({}) WHEN NOT MATCHED THEN {}{}{};",
        table_ref(dialect, req),
        source,
        on,
        insert,
        matched,
        output
    )
}

// INSERT ... ON CONFLICT (PostgreSQL)

pub fn build_on_conflict(dialect: &dyn SqlDialect, req: &StatementRequest) -> MapResult<String> {
    let merge = merge_guards(dialect, req)?;
    Ok(each_row(None, |row| on_conflict_row(dialect, req, &merge, row)))
}

pub fn build_on_conflict_all(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    batch_size: i64,
) -> MapResult<String> {
    let (merge, n) = batch_guards(dialect, req, batch_size)?;
    Ok(each_row(Some(n), |row| on_conflict_row(dialect, req, &merge, row)))
}

fn on_conflict_row(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    merge: &MergeFields<'_>,
    row: Option<usize>,
) -> String {
    if let Some(generated) = merge.keys.iter().copied().find(|k| k.is_read_only()) {
        return update_then_insert_row(dialect, req, merge, generated, row);
    }
    let action = if merge.set.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let set = merge
            .set
            .iter()
            .map(|f| {
                let column = dialect.quote_identifier(f.name());
                format!("{} = EXCLUDED.{}", column, column)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("DO UPDATE SET {}", set)
    };
    let returning = key_column(req)
        .map(|k| returning_key(dialect, k, row))
        .unwrap_or_default();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}{};",
        table_ref(dialect, req),
        column_list(dialect, &merge.inputs),
        parameter_list(dialect, &merge.inputs, row),
        column_list(dialect, &merge.keys),
        action,
        returning
    )
}

/// A generated key cannot be written through `ON CONFLICT`: the row is
/// updated by key, and inserted without the generated columns when
/// nothing matched.
fn update_then_insert_row(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    merge: &MergeFields<'_>,
    generated: &DbField,
    row: Option<usize>,
) -> String {
    let table = table_ref(dialect, req);
    let key = key_column(req);
    let returned = dialect.quote_identifier(key.unwrap_or(generated).name());
    let filter = render_keys(dialect, &merge.keys, row);
    let matched = if merge.set.is_empty() {
        format!("SELECT {} FROM {} WHERE {}", returned, table, filter)
    } else {
        format!(
            "UPDATE {} SET {} WHERE {} RETURNING {}",
            table,
            assignments(dialect, &merge.set, row),
            filter,
            returned
        )
    };
    let (columns, values) = if merge.writable.is_empty() {
        (String::new(), String::new())
    } else {
        (
            format!(" ({})", column_list(dialect, &merge.writable)),
            format!(" {}", parameter_list(dialect, &merge.writable, row)),
        )
    };
    let insert = format!(
        "INSERT INTO {}{} SELECT{} WHERE NOT EXISTS (SELECT 1 FROM matched)",
        table, columns, values
    );
    if key.is_none() {
        return format!("WITH matched AS ({}) {};", matched, insert);
    }
    let result = format!(
        "{} AS {}{}",
        returned,
        dialect.quote_identifier(RESULT_ALIAS),
        order_value(dialect, row)
    );
    format!(
        "WITH matched AS ({}), inserted AS ({} RETURNING {}) \
         SELECT {} FROM matched UNION ALL SELECT {} FROM inserted;",
        matched, insert, returned, result, result
    )
}

// INSERT ... ON DUPLICATE KEY UPDATE (MySQL)

pub fn build_on_duplicate(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    key: KeyRetrieval,
) -> MapResult<String> {
    let merge = merge_guards(dialect, req)?;
    Ok(each_row(None, |row| on_duplicate_row(dialect, req, &merge, key, row)))
}

pub fn build_on_duplicate_all(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    batch_size: i64,
    key: KeyRetrieval,
) -> MapResult<String> {
    let (merge, n) = batch_guards(dialect, req, batch_size)?;
    Ok(each_row(Some(n), |row| on_duplicate_row(dialect, req, &merge, key, row)))
}

fn on_duplicate_row(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    merge: &MergeFields<'_>,
    key: KeyRetrieval,
    row: Option<usize>,
) -> String {
    let mut set = Vec::new();
    // LAST_INSERT_ID(expr) makes the matched row's key the one read back
    if let Some(identity) = key_column(req).filter(|k| k.is_identity()) {
        let column = dialect.quote_identifier(identity.name());
        set.push(format!("{} = LAST_INSERT_ID({})", column, column));
    }
    set.extend(merge.set.iter().map(|f| {
        let column = dialect.quote_identifier(f.name());
        format!("{} = VALUES({})", column, column)
    }));
    if set.is_empty() {
        // no-op assignment keeps the existing row
        set.extend(merge.keys.iter().take(1).map(|k| {
            let column = dialect.quote_identifier(k.name());
            format!("{} = {}", column, column)
        }));
    }
    let statement = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {};",
        table_ref(dialect, req),
        column_list(dialect, &merge.inputs),
        insert_values(dialect, &merge.inputs, row),
        set.join(", ")
    );
    with_trailing_key(dialect, req, &merge.inputs, key, row, statement)
}

// INSERT OR REPLACE (SQLite)

/// `INSERT OR REPLACE` replaces on any unique constraint, so it only
/// matches the requested semantics when the qualifiers are exactly the
/// primary key.
fn require_primary_qualifiers(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    keys: &[&DbField],
) -> MapResult<()> {
    let primaries = schema(req)
        .iter()
        .filter(|f| f.is_primary())
        .collect::<Vec<_>>();
    let exact = !primaries.is_empty()
        && primaries.len() == keys.len()
        && keys.iter().all(|k| primaries.iter().any(|p| p.is_named(k.name())));
    if !exact {
        return Err(MapError::unsupported(format!(
            "{} cannot merge on non-primary qualifiers of table '{}'; \
             use an insert/replace pattern",
            dialect.name(),
            req.table
        )));
    }
    Ok(())
}

pub fn build_insert_or_replace(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    key: KeyRetrieval,
) -> MapResult<String> {
    let merge = merge_guards(dialect, req)?;
    require_primary_qualifiers(dialect, req, &merge.keys)?;
    Ok(each_row(None, |row| replace_row(dialect, req, &merge, key, row)))
}

pub fn build_insert_or_replace_all(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    batch_size: i64,
    key: KeyRetrieval,
) -> MapResult<String> {
    let (merge, n) = batch_guards(dialect, req, batch_size)?;
    require_primary_qualifiers(dialect, req, &merge.keys)?;
    Ok(each_row(Some(n), |row| replace_row(dialect, req, &merge, key, row)))
}

fn replace_row(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    merge: &MergeFields<'_>,
    key: KeyRetrieval,
    row: Option<usize>,
) -> String {
    let statement = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({});",
        table_ref(dialect, req),
        column_list(dialect, &merge.inputs),
        insert_values(dialect, &merge.inputs, row)
    );
    with_trailing_key(dialect, req, &merge.inputs, key, row, statement)
}

fn with_trailing_key(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    inputs: &[&DbField],
    key: KeyRetrieval,
    row: Option<usize>,
    statement: String,
) -> String {
    let KeyRetrieval::Select(function) = key else {
        return statement;
    };
    match key_column(req).and_then(|k| trailing_key(dialect, k, inputs, function, row)) {
        Some(value) => format!("{}{}", statement, select_key(dialect, &value, row)),
        None => statement,
    }
}
