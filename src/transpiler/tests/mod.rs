//! Statement builder test modules.
//!
//! Tests are organized by category:
//! - `core`: every operation on SQL Server
//! - `dialects`: PostgreSQL, MySQL and SQLite variations
//! - `features`: guards, batches, key return and edge cases

mod core;
mod dialects;
mod features;

use crate::error::MapResult;
use crate::schema::DbField;
use crate::transpiler::{Dialect, Operation, StatementRequest, build_statement};
use crate::value::ValueType;

/// Person { Id identity primary, Name, Age nullable }
fn person() -> Vec<DbField> {
    vec![
        DbField::new("Id", ValueType::Int64).unwrap().primary().identity(),
        DbField::new("Name", ValueType::Text).unwrap().size(100),
        DbField::new("Age", ValueType::Int32).unwrap().nullable(),
    ]
}

fn request() -> StatementRequest {
    StatementRequest::new("Person", person())
}

/// Country { Code primary supplied by the caller, Name }
fn country() -> StatementRequest {
    StatementRequest::new(
        "Country",
        vec![
            DbField::new("Code", ValueType::Text).unwrap().primary().size(2),
            DbField::new("Name", ValueType::Text).unwrap(),
        ],
    )
}

fn build(dialect: Dialect, op: Operation, req: &StatementRequest) -> MapResult<String> {
    build_statement(dialect.builder().as_ref(), &op, req)
}

fn sql(dialect: Dialect, op: Operation, req: &StatementRequest) -> String {
    build(dialect, op, req).unwrap()
}
