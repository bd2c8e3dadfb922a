//! INSERT statements, single and batched.

use super::{
    KeyRetrieval, ORDER_COLUMN, column_list, output_key, parameter_list, returning_key,
    select_key, source_list, table_ref, trailing_key, values_rows,
};
use crate::error::{MapError, MapResult};
use crate::schema::DbField;
use crate::transpiler::fields::{insertable, key_column};
use crate::transpiler::{SqlDialect, StatementRequest, guards};

fn insert_guards<'a>(
    dialect: &dyn SqlDialect,
    req: &'a StatementRequest,
) -> MapResult<Vec<&'a DbField>> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    guards::require_fields(req)?;
    guards::require_primary(req)?;
    let inputs = insertable(req);
    if inputs.is_empty() {
        return Err(MapError::argument(format!(
            "no insertable fields for table '{}'",
            req.table
        )));
    }
    Ok(inputs)
}

pub fn build_insert(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    key: KeyRetrieval,
) -> MapResult<String> {
    let inputs = insert_guards(dialect, req)?;
    Ok(insert_row(dialect, req, &inputs, key, None))
}

/// One INSERT of `inputs`; `row` suffixes the parameters and adds the
/// order value next to the returned key.
fn insert_row(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    inputs: &[&DbField],
    key: KeyRetrieval,
    row: Option<usize>,
) -> String {
    let table = table_ref(dialect, req);
    let columns = column_list(dialect, inputs);
    let params = parameter_list(dialect, inputs, row);

    let Some(key_field) = key_column(req) else {
        return format!("INSERT INTO {} ({}) VALUES ({});", table, columns, params);
    };

    match key {
        KeyRetrieval::Output => format!(
            "INSERT INTO {} ({}){} VALUES ({});",
            table,
            columns,
            output_key(dialect, key_field, false),
            params
        ),
        KeyRetrieval::Returning => format!(
            "INSERT INTO {} ({}) VALUES ({}){};",
            table,
            columns,
            params,
            returning_key(dialect, key_field, row)
        ),
        KeyRetrieval::Select(function) => {
            let insert = format!("INSERT INTO {} ({}) VALUES ({});", table, columns, params);
            match trailing_key(dialect, key_field, inputs, function, row) {
                Some(value) => format!("{}{}", insert, select_key(dialect, &value, row)),
                None => insert,
            }
        }
    }
}

/// Batch insert of `batch_size` rows.
///
/// Without a key to return this is one multi-row INSERT. With a key, an
/// `Output` dialect inserts through a single MERGE carrying the row index in
/// `__OrderColumn`; the others emit one statement per row, each returning
/// its key next to the row index.
pub fn build_insert_all(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    batch_size: i64,
    key: KeyRetrieval,
) -> MapResult<String> {
    let inputs = insert_guards(dialect, req)?;
    guards::reject_predicate(req, "InsertAll")?;
    let rows = guards::positive("batch_size", batch_size)?;
    guards::parameter_limit(dialect, batch_size, rows, inputs.len())?;
    let rows = rows as usize;

    let Some(key_field) = key_column(req) else {
        let values = (0..rows)
            .map(|i| format!("({})", parameter_list(dialect, &inputs, Some(i))))
            .collect::<Vec<_>>()
            .join(", ");
        return Ok(format!(
            "INSERT INTO {} ({}) VALUES {};",
            table_ref(dialect, req),
            column_list(dialect, &inputs),
            values
        ));
    };

    if key == KeyRetrieval::Output {
        let columns = column_list(dialect, &inputs);
        return Ok(format!(
            "MERGE {} AS T USING (VALUES {}) AS S ({}, {}) ON 1 = 0 \
             WHEN NOT MATCHED THEN INSERT ({}) VALUES ({}){};",
            table_ref(dialect, req),
            values_rows(dialect, &inputs, rows),
            columns,
            dialect.quote_identifier(ORDER_COLUMN),
            columns,
            source_list(dialect, &inputs),
            output_key(dialect, key_field, true)
        ));
    }

    Ok((0..rows)
        .map(|i| insert_row(dialect, req, &inputs, key, Some(i)))
        .collect::<Vec<_>>()
        .join(" "))
}
