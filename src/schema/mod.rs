//! Table schema seen by the engine.
//!
//! The engine never introspects a database itself. A [`SchemaProvider`]
//! supplies the ordered column set of a table and the engine caches it
//! through [`SchemaCache`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{MapError, MapResult};
use crate::predicate::sanitize_parameter;
use crate::value::ValueType;

pub mod cache;

pub use cache::SchemaCache;

/// Errors raised by a schema collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Schema provider error: {0}")]
    Provider(String),
}

/// A column as described by the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DbField {
    name: String,
    is_primary: bool,
    is_identity: bool,
    is_nullable: bool,
    value_type: ValueType,
    size: Option<u32>,
    precision: Option<u8>,
    scale: Option<u8>,
    database_type: Option<String>,
    has_default_value: bool,
    is_generated: bool,
    provider: Option<String>,
    /// Parameter name when the sanitized column name is taken by another
    /// column of the same table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameter: Option<String>,
}

impl DbField {
    /// Create a column description. The name must not be empty.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> MapResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MapError::argument("column name must not be empty"));
        }
        Ok(Self {
            name,
            is_primary: false,
            is_identity: false,
            is_nullable: false,
            value_type,
            size: None,
            precision: None,
            scale: None,
            database_type: None,
            has_default_value: false,
            is_generated: false,
            provider: None,
            parameter: None,
        })
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn database_type(mut self, name: impl Into<String>) -> Self {
        self.database_type = Some(name.into());
        self
    }

    pub fn default_value(mut self) -> Self {
        self.has_default_value = true;
        self
    }

    pub fn generated(mut self) -> Self {
        self.is_generated = true;
        self
    }

    pub fn provider(mut self, tag: impl Into<String>) -> Self {
        self.provider = Some(tag.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter name bound for this column, without row suffix or prefix.
    pub fn parameter_name(&self) -> String {
        match &self.parameter {
            Some(name) => name.clone(),
            None => sanitize_parameter(&self.name),
        }
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn is_identity(&self) -> bool {
        self.is_identity
    }

    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn size_limit(&self) -> Option<u32> {
        self.size
    }

    pub fn numeric_precision(&self) -> Option<(u8, u8)> {
        match (self.precision, self.scale) {
            (Some(p), Some(s)) => Some((p, s)),
            _ => None,
        }
    }

    pub fn database_type_name(&self) -> Option<&str> {
        self.database_type.as_deref()
    }

    pub fn has_default_value(&self) -> bool {
        self.has_default_value
    }

    pub fn is_generated(&self) -> bool {
        self.is_generated
    }

    pub fn provider_tag(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Identity and generated columns are never supplied as input.
    pub fn is_read_only(&self) -> bool {
        self.is_generated || self.is_identity
    }

    /// Whether `name` refers to this column (case-insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Give every column of a table a distinct parameter name.
///
/// Columns whose sanitized names clash (`First Name` and `First_Name`, or
/// names differing only in case) get `_1`, `_2`, ... in column order.
pub fn assign_parameter_names(fields: &mut [DbField]) {
    let mut taken = HashSet::new();
    for field in fields.iter_mut() {
        let base = sanitize_parameter(&field.name);
        let mut name = base.clone();
        let mut suffix = 0;
        while taken.contains(&name.to_lowercase()) {
            suffix += 1;
            name = format!("{}_{}", base, suffix);
        }
        taken.insert(name.to_lowercase());
        field.parameter = (name != base).then_some(name);
    }
}

/// Copy the parameter names of `schema` onto the matching `fields`.
pub fn sync_parameter_names(fields: &mut [DbField], schema: &[DbField]) {
    for field in fields.iter_mut() {
        if let Some(column) = find_field(schema, &field.name) {
            field.parameter = column.parameter.clone();
        }
    }
}

/// Find a column by name, ignoring case.
pub fn find_field<'a>(fields: &'a [DbField], name: &str) -> Option<&'a DbField> {
    fields.iter().find(|f| f.is_named(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaObjectKind {
    Table,
    View,
}

/// A table or view known to the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    pub kind: SchemaObjectKind,
    pub name: String,
    pub schema: Option<String>,
}

/// Source of table schemas.
///
/// Implementations own their connection. The async methods default to the
/// synchronous ones for providers that never block.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Ordered column set of `table`.
    fn get_fields(&self, table: &str) -> Result<Vec<DbField>, SchemaError>;

    /// Tables and views visible to the provider.
    fn get_schema_objects(&self) -> Result<Vec<SchemaObject>, SchemaError>;

    async fn get_fields_async(&self, table: &str) -> Result<Vec<DbField>, SchemaError> {
        self.get_fields(table)
    }

    async fn get_schema_objects_async(&self) -> Result<Vec<SchemaObject>, SchemaError> {
        self.get_schema_objects()
    }
}

/// A fixed, in-memory schema.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchema {
    objects: Vec<SchemaObject>,
    fields: HashMap<String, Vec<DbField>>,
}

impl InMemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table and its ordered columns.
    pub fn table(self, name: &str, fields: Vec<DbField>) -> Self {
        self.object(SchemaObjectKind::Table, name, fields)
    }

    /// Register a view and its ordered columns.
    pub fn view(self, name: &str, fields: Vec<DbField>) -> Self {
        self.object(SchemaObjectKind::View, name, fields)
    }

    fn object(mut self, kind: SchemaObjectKind, name: &str, fields: Vec<DbField>) -> Self {
        let (schema, bare) = match name.split_once('.') {
            Some((schema, bare)) => (Some(schema.to_string()), bare.to_string()),
            None => (None, name.to_string()),
        };
        self.objects.push(SchemaObject {
            kind,
            name: bare,
            schema,
        });
        self.fields.insert(name.to_lowercase(), fields);
        self
    }
}

impl SchemaProvider for InMemorySchema {
    fn get_fields(&self, table: &str) -> Result<Vec<DbField>, SchemaError> {
        self.fields
            .get(&table.to_lowercase())
            .cloned()
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))
    }

    fn get_schema_objects(&self) -> Result<Vec<SchemaObject>, SchemaError> {
        Ok(self.objects.clone())
    }
}
