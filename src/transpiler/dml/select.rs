//! SELECT statements: plain, paged, skip/take, exists, count and aggregates.

use super::{order_clause, order_list, select_list, table_ref};
use crate::error::{MapError, MapResult};
use crate::schema::find_field;
use crate::transpiler::conditions::render_where;
use crate::transpiler::traits::quote_name;
use crate::transpiler::{Aggregate, SqlDialect, StatementRequest, fields, guards};

/// How a dialect caps the number of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimit {
    /// `SELECT TOP (n) ...`
    Top,
    /// `... LIMIT n`
    Limit,
}

fn filter(dialect: &dyn SqlDialect, req: &StatementRequest) -> String {
    render_where(dialect, req.active_predicate(), &[])
}

fn query_guards(dialect: &dyn SqlDialect, req: &StatementRequest) -> MapResult<()> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    guards::require_fields(req)
}

fn paged_guards(dialect: &dyn SqlDialect, req: &StatementRequest) -> MapResult<()> {
    query_guards(dialect, req)?;
    guards::require_order(req)
}

pub fn build_query(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    top: Option<i64>,
    limit: RowLimit,
) -> MapResult<String> {
    query_guards(dialect, req)?;
    let top = top.map(|t| guards::positive("top", t)).transpose()?;

    let columns = select_list(dialect, req);
    let table = table_ref(dialect, req);
    let filter = filter(dialect, req);
    let order = order_clause(dialect, &req.order_by);

    Ok(match (limit, top) {
        (RowLimit::Top, Some(n)) => {
            format!("SELECT TOP ({}) {} FROM {}{}{};", n, columns, table, filter, order)
        }
        (RowLimit::Limit, Some(n)) => {
            format!("SELECT {} FROM {}{}{} LIMIT {};", columns, table, filter, order, n)
        }
        (_, None) => format!("SELECT {} FROM {}{}{};", columns, table, filter, order),
    })
}

/// Zero-based page through `ROW_NUMBER()` over a CTE.
pub fn build_row_number_page(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    page: i64,
    rows_per_batch: i64,
) -> MapResult<String> {
    paged_guards(dialect, req)?;
    let page_index = guards::non_negative("page", page)?;
    let rows = guards::positive("rows_per_batch", rows_per_batch)?;
    let first = page_index
        .checked_mul(rows)
        .and_then(|offset| offset.checked_add(1))
        .ok_or_else(|| MapError::range("page", page))?;
    let last = first
        .checked_add(rows - 1)
        .ok_or_else(|| MapError::range("page", page))?;

    let columns = select_list(dialect, req);
    let row_number = dialect.quote_identifier("RowNumber");
    Ok(format!(
        "WITH CTE AS (SELECT ROW_NUMBER() OVER (ORDER BY {}) AS {}, {} FROM {}{}) \
         SELECT {} FROM CTE WHERE ({} BETWEEN {} AND {}) ORDER BY {} ASC;",
        order_list(dialect, &req.order_by),
        row_number,
        columns,
        table_ref(dialect, req),
        filter(dialect, req),
        columns,
        row_number,
        first,
        last,
        row_number
    ))
}

/// Zero-based page through `LIMIT`/`OFFSET`.
pub fn build_limit_page(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    page: i64,
    rows_per_batch: i64,
) -> MapResult<String> {
    paged_guards(dialect, req)?;
    let page_index = guards::non_negative("page", page)?;
    let rows = guards::positive("rows_per_batch", rows_per_batch)?;
    let offset = page_index
        .checked_mul(rows)
        .ok_or_else(|| MapError::range("page", page))?;
    Ok(limit_offset(dialect, req, rows, offset))
}

/// `OFFSET n ROWS FETCH NEXT m ROWS ONLY`.
pub fn build_offset_fetch(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    skip: i64,
    take: i64,
) -> MapResult<String> {
    paged_guards(dialect, req)?;
    let skip = guards::non_negative("skip", skip)?;
    let take = guards::positive("take", take)?;
    Ok(format!(
        "SELECT {} FROM {}{}{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY;",
        select_list(dialect, req),
        table_ref(dialect, req),
        filter(dialect, req),
        order_clause(dialect, &req.order_by),
        skip,
        take
    ))
}

pub fn build_limit_skip(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    skip: i64,
    take: i64,
) -> MapResult<String> {
    paged_guards(dialect, req)?;
    let skip = guards::non_negative("skip", skip)?;
    let take = guards::positive("take", take)?;
    Ok(limit_offset(dialect, req, take, skip))
}

fn limit_offset(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    limit: u64,
    offset: u64,
) -> String {
    format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {};",
        select_list(dialect, req),
        table_ref(dialect, req),
        filter(dialect, req),
        order_clause(dialect, &req.order_by),
        limit,
        offset
    )
}

pub fn build_exists(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    limit: RowLimit,
) -> MapResult<String> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    let alias = dialect.quote_identifier("ExistsValue");
    let table = table_ref(dialect, req);
    let filter = filter(dialect, req);
    Ok(match limit {
        RowLimit::Top => format!("SELECT TOP (1) 1 AS {} FROM {}{};", alias, table, filter),
        RowLimit::Limit => format!("SELECT 1 AS {} FROM {}{} LIMIT 1;", alias, table, filter),
    })
}

/// `function` is `COUNT` or `COUNT_BIG`.
pub fn build_count(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    function: &str,
) -> MapResult<String> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    Ok(format!(
        "SELECT {} (1) AS {} FROM {}{};",
        function,
        dialect.quote_identifier("CountValue"),
        table_ref(dialect, req),
        filter(dialect, req)
    ))
}

pub fn build_aggregate(
    dialect: &dyn SqlDialect,
    req: &StatementRequest,
    function: Aggregate,
    field: &str,
) -> MapResult<String> {
    guards::require_table(req)?;
    guards::check_hints(dialect, req)?;
    if field.trim().is_empty() {
        return Err(MapError::argument(format!(
            "{} requires a field on table '{}'",
            function.function(),
            req.table
        )));
    }
    let schema = fields::schema(req);
    if !schema.is_empty() && find_field(schema, field).is_none() {
        return Err(MapError::argument(format!(
            "field '{}' not found on table '{}'",
            field, req.table
        )));
    }
    Ok(format!(
        "SELECT {} ({}) AS {} FROM {}{};",
        function.function(),
        quote_name(dialect, field),
        dialect.quote_identifier(function.alias()),
        table_ref(dialect, req),
        filter(dialect, req)
    ))
}
