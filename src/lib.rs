//! # qail-map
//!
//! Typed data access for QAIL: filter expressions over mapped entity types,
//! parameterized SQL for SQL Server, PostgreSQL, MySQL and SQLite, and a
//! process-wide cache of execution plans.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use qail_map::prelude::*;
//!
//! entity! {
//!     Person => "Person" {
//!         id: i64 => "Id",
//!         name: String => "Name",
//!         age: Option<i32> => "Age",
//!     }
//! }
//!
//! let compiler = OperationCompiler::new(schema, EngineOptions::default());
//!
//! // Typed filter
//! let filter = compiler
//!     .compile_filter(&(Person::name().starts_with("Jo") & Person::age().gte(18)))?;
//!
//! // Same filter from text
//! let same = compiler.compile_text::<Person>(r#"x => x.Name.StartsWith("Jo") && x.Age >= 18"#)?;
//!
//! let plan = compiler.get_or_create_plan::<Person>(&PlanRequest::new(Operation::Insert))?;
//! // => "INSERT INTO [Person] ([Name], [Age]) OUTPUT INSERTED.[Id] AS [Result]
//! //     VALUES (@Name, @Age);"
//! let command = plan.create_command(&[person], None)?;
//! ```
//!
//! ## Layers
//!
//! | Module       | Role                                            |
//! |--------------|-------------------------------------------------|
//! | `expr`       | Typed DSL, textual parser, expression compiler  |
//! | `predicate`  | Dialect-neutral filter AST and parameter names  |
//! | `transpiler` | One statement builder per dialect               |
//! | `plan`       | Operation compiler and execution plan cache     |
//! | `schema`     | Column metadata seam and schema cache           |

pub mod command;
pub mod config;
pub mod entity;
pub mod error;
pub mod expr;
pub mod plan;
pub mod predicate;
pub mod schema;
pub mod trace;
pub mod transpiler;
pub mod value;

pub mod prelude {
    pub use crate::command::{DbCommand, DbParameter};
    pub use crate::config::{EngineOptions, EnumRepr, KeyReturnPolicy, NullSemantics};
    pub use crate::entity::{Entity, EntityMap, HandlerRegistry, PropertyHandler, PropertyMap};
    pub use crate::error::{MapError, MapResult};
    pub use crate::expr::{Expr, ExpressionCompiler, Filter, TypedColumn, parse_filter};
    pub use crate::plan::{ExecutionPlan, OperationCompiler, PlanRequest};
    pub use crate::predicate::{Field, Operator, PredicateGroup, PredicateNode};
    pub use crate::schema::{DbField, InMemorySchema, SchemaProvider};
    pub use crate::trace::{LogTracer, TraceLog, Tracer};
    pub use crate::transpiler::{Aggregate, Dialect, Operation, OrderField};
    pub use crate::value::{EnumValue, Value, ValueType};
    pub use crate::{db_enum, entity};
}

/// Compile a textual filter over `E` with default options.
///
/// # Example
///
/// ```rust,ignore
/// let group = qail_map::compile_filter::<Person>("x => x.Age >= 18")?;
/// ```
pub fn compile_filter<E: entity::Entity>(
    text: &str,
) -> error::MapResult<predicate::PredicateGroup> {
    expr::ExpressionCompiler::default().compile_text::<E>(text)
}
