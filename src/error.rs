//! Error types for qail-map.
//!
//! Every error is raised while compiling or building, before anything
//! reaches a database connection. Variants carry the offending identifier
//! (table, field or expression text) so a failure can be diagnosed from the
//! message alone.

use thiserror::Error;

use crate::schema::SchemaError;

/// The main error type for qail-map operations.
#[derive(Debug, Error)]
pub enum MapError {
    /// A required argument is missing or malformed (table, fields, order, filter text).
    #[error("Invalid argument: {0}")]
    ArgumentInvalid(String),

    /// The dialect or the compiler does not support the requested feature.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// The filter expression has a shape the compiler cannot translate.
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A member of a filter expression does not map to an entity property.
    #[error("Property '{member}' not found on '{entity}'{}", suggestion_suffix(.suggestion))]
    PropertyNotFound {
        entity: String,
        member: String,
        suggestion: Option<String>,
    },

    /// Insert or merge is missing a primary key the database cannot generate.
    #[error("Primary field '{field}' of table '{table}' must be present in the field list")]
    PrimaryFieldMissing { table: String, field: String },

    /// Merge/update qualifiers could not be resolved against the field list.
    #[error("Invalid qualifier '{field}' for table '{table}'")]
    QualifierInvalid { table: String, field: String },

    /// A numeric argument (page, skip, take, batch size) is out of range.
    #[error("Value {value} is out of range for '{name}'")]
    RangeInvalid { name: &'static str, value: i64 },

    /// Binder or key-setter compilation failed.
    #[error("Compile error: {0}")]
    CompileError(String),

    /// A value could not be converted into the requested Rust type.
    #[error("Cannot convert {found} into {expected}")]
    Conversion {
        expected: &'static str,
        found: String,
    },

    /// Schema resolution failed; propagated unchanged from the collaborator.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Options could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(". Did you mean '{}'?", s),
        None => String::new(),
    }
}

impl MapError {
    /// Create an invalid-argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::ArgumentInvalid(message.into())
    }

    /// Create an unsupported-feature error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedFeature(message.into())
    }

    /// Create a compile error.
    pub fn compile(message: impl Into<String>) -> Self {
        Self::CompileError(message.into())
    }

    /// Create a range error for the named argument.
    pub fn range(name: &'static str, value: i64) -> Self {
        Self::RangeInvalid { name, value }
    }

    /// Create a qualifier error.
    pub fn qualifier(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self::QualifierInvalid {
            table: table.into(),
            field: field.into(),
        }
    }
}

/// Result type alias for qail-map operations.
pub type MapResult<T> = Result<T, MapError>;
