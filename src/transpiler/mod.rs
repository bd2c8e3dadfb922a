//! Multi-dialect statement builder.
//!
//! Turns a [`StatementRequest`] (table, columns, filter, order) into
//! parameterized SQL text for one of the supported dialects. Every dialect
//! implements [`StatementBuilder`] and composes the shared helpers in
//! [`dml`] explicitly; nothing is inherited.

pub mod conditions;
pub mod dml;
pub mod fields;
pub mod guards;
pub mod sql;
pub mod tidy;
pub mod traits;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::config::KeyReturnPolicy;
use crate::error::MapResult;
use crate::predicate::PredicateGroup;
use crate::schema::{DbField, assign_parameter_names, sync_parameter_names};

pub use sql::mysql::MySqlGenerator;
pub use sql::postgres::PostgresGenerator;
pub use sql::sqlite::SqliteGenerator;
pub use sql::sqlserver::SqlServerGenerator;
pub use traits::SqlDialect;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    #[serde(rename = "sqlserver")]
    SqlServer,
    #[serde(rename = "postgres")]
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "sqlite")]
    Sqlite,
}

impl Dialect {
    pub fn builder(&self) -> Box<dyn StatementBuilder> {
        match self {
            Dialect::SqlServer => Box::new(SqlServerGenerator),
            Dialect::Postgres => Box::new(PostgresGenerator),
            Dialect::MySql => Box::new(MySqlGenerator),
            Dialect::Sqlite => Box::new(SqliteGenerator),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One ORDER BY column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderField {
    pub name: String,
    pub order: SortOrder,
}

impl OrderField {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Aggregate function of an aggregate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregate {
    Min,
    Max,
    Sum,
    Avg,
}

impl Aggregate {
    pub fn function(&self) -> &'static str {
        match self {
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
        }
    }

    /// Column alias of the result.
    pub fn alias(&self) -> &'static str {
        match self {
            Aggregate::Min => "MinValue",
            Aggregate::Max => "MaxValue",
            Aggregate::Sum => "SumValue",
            Aggregate::Avg => "AverageValue",
        }
    }
}

/// Operation kinds the builders emit statements for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Query { top: Option<i64> },
    /// Zero-based page of `rows_per_batch` rows.
    PagedQuery { page: i64, rows_per_batch: i64 },
    SkipQuery { skip: i64, take: i64 },
    Insert,
    InsertAll { batch_size: i64 },
    Update,
    UpdateAll { batch_size: i64 },
    Merge,
    MergeAll { batch_size: i64 },
    Delete,
    DeleteAll,
    Exists,
    Count,
    Aggregate { function: Aggregate, field: String },
    Truncate,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Query { .. } => "Query",
            Operation::PagedQuery { .. } => "PagedQuery",
            Operation::SkipQuery { .. } => "SkipQuery",
            Operation::Insert => "Insert",
            Operation::InsertAll { .. } => "InsertAll",
            Operation::Update => "Update",
            Operation::UpdateAll { .. } => "UpdateAll",
            Operation::Merge => "Merge",
            Operation::MergeAll { .. } => "MergeAll",
            Operation::Delete => "Delete",
            Operation::DeleteAll => "DeleteAll",
            Operation::Exists => "Exists",
            Operation::Count => "Count",
            Operation::Aggregate { .. } => "Aggregate",
            Operation::Truncate => "Truncate",
        }
    }

    /// Rows bound per command: the batch size of batch operations, else 1.
    pub fn rows(&self) -> usize {
        match self {
            Operation::InsertAll { batch_size }
            | Operation::UpdateAll { batch_size }
            | Operation::MergeAll { batch_size } => usize::try_from(*batch_size).unwrap_or(0),
            _ => 1,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(
            self,
            Operation::InsertAll { .. } | Operation::UpdateAll { .. } | Operation::MergeAll { .. }
        )
    }

    /// Whether the statement reads a generated key back.
    pub fn returns_key(&self) -> bool {
        matches!(
            self,
            Operation::Insert
                | Operation::InsertAll { .. }
                | Operation::Merge
                | Operation::MergeAll { .. }
        )
    }
}

/// Input of a statement builder.
#[derive(Debug, Clone, Default)]
pub struct StatementRequest {
    /// Target table, optionally schema-qualified.
    pub table: String,
    /// Requested columns in order.
    pub fields: Vec<DbField>,
    /// Full column set of the table. Empty means `fields` is all there is.
    pub db_fields: Vec<DbField>,
    /// Columns matching existing rows for merge/update/delete.
    pub qualifiers: Option<Vec<String>>,
    pub predicate: Option<PredicateGroup>,
    pub order_by: Vec<OrderField>,
    pub hints: Option<String>,
    pub key_return: KeyReturnPolicy,
}

impl StatementRequest {
    /// Request over `fields`; without a [`schema`](Self::schema) they also
    /// stand for the whole table.
    pub fn new(table: impl Into<String>, mut fields: Vec<DbField>) -> Self {
        assign_parameter_names(&mut fields);
        Self {
            table: table.into(),
            fields,
            ..Self::default()
        }
    }

    pub fn schema(mut self, mut db_fields: Vec<DbField>) -> Self {
        assign_parameter_names(&mut db_fields);
        sync_parameter_names(&mut self.fields, &db_fields);
        self.db_fields = db_fields;
        self
    }

    pub fn qualifiers<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.qualifiers = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, predicate: PredicateGroup) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn order_by(mut self, order: Vec<OrderField>) -> Self {
        self.order_by = order;
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }

    pub fn key_return(mut self, policy: KeyReturnPolicy) -> Self {
        self.key_return = policy;
        self
    }

    /// The filter, if it has any condition.
    pub fn active_predicate(&self) -> Option<&PredicateGroup> {
        self.predicate.as_ref().filter(|p| !p.is_empty())
    }
}

/// One statement per operation kind.
///
/// Implementations are stateless; identical requests always produce
/// identical text. A guard failure returns an error and no text.
pub trait StatementBuilder: SqlDialect {
    fn query(&self, req: &StatementRequest, top: Option<i64>) -> MapResult<String>;

    fn paged_query(
        &self,
        req: &StatementRequest,
        page: i64,
        rows_per_batch: i64,
    ) -> MapResult<String>;

    fn skip_query(&self, req: &StatementRequest, skip: i64, take: i64) -> MapResult<String>;

    fn insert(&self, req: &StatementRequest) -> MapResult<String>;

    fn insert_all(&self, req: &StatementRequest, batch_size: i64) -> MapResult<String>;

    fn update(&self, req: &StatementRequest) -> MapResult<String>;

    fn update_all(&self, req: &StatementRequest, batch_size: i64) -> MapResult<String>;

    fn merge(&self, req: &StatementRequest) -> MapResult<String>;

    fn merge_all(&self, req: &StatementRequest, batch_size: i64) -> MapResult<String>;

    fn delete(&self, req: &StatementRequest) -> MapResult<String>;

    fn delete_all(&self, req: &StatementRequest) -> MapResult<String>;

    fn exists(&self, req: &StatementRequest) -> MapResult<String>;

    fn count(&self, req: &StatementRequest) -> MapResult<String>;

    fn aggregate(
        &self,
        req: &StatementRequest,
        function: Aggregate,
        field: &str,
    ) -> MapResult<String>;

    fn truncate(&self, req: &StatementRequest) -> MapResult<String>;
}

/// Build the statement of `op` and run the cosmetic [`tidy`] pass over it.
pub fn build_statement(
    builder: &dyn StatementBuilder,
    op: &Operation,
    req: &StatementRequest,
) -> MapResult<String> {
    let raw = match op {
        Operation::Query { top } => builder.query(req, *top),
        Operation::PagedQuery {
            page,
            rows_per_batch,
        } => builder.paged_query(req, *page, *rows_per_batch),
        Operation::SkipQuery { skip, take } => builder.skip_query(req, *skip, *take),
        Operation::Insert => builder.insert(req),
        Operation::InsertAll { batch_size } => builder.insert_all(req, *batch_size),
        Operation::Update => builder.update(req),
        Operation::UpdateAll { batch_size } => builder.update_all(req, *batch_size),
        Operation::Merge => builder.merge(req),
        Operation::MergeAll { batch_size } => builder.merge_all(req, *batch_size),
        Operation::Delete => builder.delete(req),
        Operation::DeleteAll => builder.delete_all(req),
        Operation::Exists => builder.exists(req),
        Operation::Count => builder.count(req),
        Operation::Aggregate { function, field } => builder.aggregate(req, *function, field),
        Operation::Truncate => builder.truncate(req),
    }?;

    let sql = tidy::tidy(&raw);
    tracing::trace!("{} {} on '{}': {}", builder.name(), op.name(), req.table, sql);
    Ok(sql)
}
