//! Execution plans.
//!
//! An [`ExecutionPlan`] holds the SQL text of one operation shape together
//! with the compiled binder that fills a [`DbCommand`] from entities and the
//! key setter that writes generated keys back. Plans are built once per
//! shape by the [`OperationCompiler`] and shared through the [`PlanCache`].

pub mod binder;
pub mod cache;
pub mod compiler;
pub mod key;

use std::sync::Arc;

pub use binder::{Binder, KeySetter};
pub use cache::{CacheStats, PlanCache};
pub use compiler::OperationCompiler;
pub use key::{KeyInterner, PlanKey};

use crate::command::DbCommand;
use crate::error::{MapError, MapResult};
use crate::predicate::PredicateGroup;
use crate::schema::DbField;
use crate::transpiler::{Operation, OrderField};
use crate::value::Value;

/// What to compile: an operation on an entity type plus its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub operation: Operation,
    /// Defaults to the entity's mapped table.
    pub table: Option<String>,
    /// Property or column names; defaults to every mapped property.
    pub fields: Option<Vec<String>>,
    pub qualifiers: Option<Vec<String>>,
    pub predicate: Option<PredicateGroup>,
    pub order_by: Vec<OrderField>,
    pub hints: Option<String>,
}

impl PlanRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            table: None,
            fields: None,
            qualifiers: None,
            predicate: None,
            order_by: Vec::new(),
            hints: None,
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
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

    /// Shape hash of a non-empty filter.
    pub fn predicate_shape(&self) -> Option<u64> {
        self.predicate
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(PredicateGroup::shape_hash)
    }
}

/// Compiled SQL and accessors of one operation shape.
pub struct ExecutionPlan<E> {
    operation: Operation,
    table: Arc<str>,
    text: Arc<str>,
    input_fields: Vec<DbField>,
    reserved: Vec<String>,
    predicate_shape: Option<u64>,
    binder: Binder<E>,
    key_setter: Option<KeySetter<E>>,
}

impl<E> std::fmt::Debug for ExecutionPlan<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("operation", &self.operation)
            .field("table", &self.table)
            .field("text", &self.text)
            .field("input_fields", &self.input_fields.len())
            .field("key", &self.key_setter.as_ref().map(|k| k.field().name()))
            .finish()
    }
}

impl<E> ExecutionPlan<E> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        operation: Operation,
        table: Arc<str>,
        text: Arc<str>,
        input_fields: Vec<DbField>,
        reserved: Vec<String>,
        predicate_shape: Option<u64>,
        binder: Binder<E>,
        key_setter: Option<KeySetter<E>>,
    ) -> Self {
        Self {
            operation,
            table,
            text,
            input_fields,
            reserved,
            predicate_shape,
            binder,
            key_setter,
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The cached text allocation; identical shapes share it.
    pub fn shared_text(&self) -> &Arc<str> {
        &self.text
    }

    /// Columns bound from each entity, in parameter order.
    pub fn input_fields(&self) -> &[DbField] {
        &self.input_fields
    }

    /// Parameter names the filter must not reuse.
    pub fn reserved_names(&self) -> &[String] {
        &self.reserved
    }

    /// Column written back after execution, if any.
    pub fn key_field(&self) -> Option<&DbField> {
        self.key_setter.as_ref().map(KeySetter::field)
    }

    /// Bind `entities` and the values of `predicate` into a new command.
    ///
    /// Batch plans take exactly as many entities as they have rows, other
    /// plans with input columns take one. The filter must have the shape the
    /// plan was compiled for.
    pub fn create_command(
        &self,
        entities: &[E],
        predicate: Option<&PredicateGroup>,
    ) -> MapResult<DbCommand> {
        let predicate = predicate.filter(|p| !p.is_empty());
        if predicate.map(PredicateGroup::shape_hash) != self.predicate_shape {
            return Err(MapError::argument(format!(
                "filter does not match the compiled {} plan on '{}'",
                self.operation.name(),
                self.table
            )));
        }

        let mut command = DbCommand::new(self.text.clone());

        if !self.binder.is_empty() {
            let rows = self.operation.rows();
            if entities.len() != rows {
                return Err(MapError::argument(format!(
                    "{} plan on '{}' binds {} row(s), got {}",
                    self.operation.name(),
                    self.table,
                    rows,
                    entities.len()
                )));
            }
            let batch = self.operation.is_batch();
            for (index, entity) in entities.iter().enumerate() {
                self.binder
                    .bind(entity, &mut command, batch.then_some(index))?;
            }
        }

        if let Some(predicate) = predicate {
            command.extend(predicate.parameters(&self.reserved));
        }

        Ok(command)
    }

    /// Write a returned key onto `entity`.
    pub fn apply_key(&self, entity: &mut E, value: Value) -> MapResult<()> {
        match &self.key_setter {
            Some(setter) => setter.apply(entity, value),
            None => Ok(()),
        }
    }

    /// Write `(Result, OrderColumn)` rows of a batch back onto `entities`,
    /// matching each row by its order value.
    pub fn apply_keys(&self, entities: &mut [E], rows: &[(Value, Value)]) -> MapResult<()> {
        let Some(setter) = &self.key_setter else {
            return Ok(());
        };
        for (value, order) in rows {
            let index = match order {
                Value::Int(i) => usize::try_from(*i).ok(),
                _ => None,
            };
            let entity = index
                .and_then(|i| entities.get_mut(i))
                .ok_or_else(|| {
                    MapError::argument(format!("order value {} matches no entity", order))
                })?;
            setter.apply(entity, value.clone())?;
        }
        Ok(())
    }
}
