//! Compiled parameter binders and key setters.
//!
//! Compilation resolves every column to its property accessor once; binding
//! afterwards is a straight walk over function pointers.

use std::sync::Arc;

use crate::command::DbCommand;
use crate::config::EnumRepr;
use crate::entity::{EntityMap, Getter, HandlerRegistry, PropertyHandler, Setter, convert_enum};
use crate::error::{MapError, MapResult};
use crate::schema::DbField;
use crate::transpiler::fields::parameter_name;
use crate::value::Value;

/// Writes one column of an entity into a command.
struct FieldBinder<E> {
    field: DbField,
    getter: Getter<E>,
    handler: Option<Arc<dyn PropertyHandler>>,
    repr: EnumRepr,
}

impl<E> FieldBinder<E> {
    fn value(&self, entity: &E) -> MapResult<Value> {
        let value = (self.getter)(entity);
        match &self.handler {
            Some(handler) => handler.to_db(value, &self.field),
            None => Ok(convert_enum(value, self.repr)),
        }
    }
}

/// Binds the input columns of an entity under their parameter names.
pub struct Binder<E> {
    fields: Vec<FieldBinder<E>>,
}

impl<E: 'static> Binder<E> {
    /// Resolve `fields` against the entity's properties.
    pub fn compile(
        map: &EntityMap<E>,
        fields: &[DbField],
        handlers: &HandlerRegistry,
        default_repr: EnumRepr,
    ) -> MapResult<Self> {
        let fields = fields
            .iter()
            .map(|field| {
                let property = map.property_for_column(field.name()).ok_or_else(|| {
                    MapError::compile(format!(
                        "no property of '{}' maps to column '{}'",
                        map.entity(),
                        field.name()
                    ))
                })?;
                Ok(FieldBinder {
                    field: field.clone(),
                    getter: property.getter(),
                    handler: handlers.get::<E>(property.name()),
                    repr: property.conversion().unwrap_or(default_repr),
                })
            })
            .collect::<MapResult<Vec<_>>>()?;
        Ok(Self { fields })
    }
}

impl<E> Binder<E> {
    /// Write every input column of `entity`; `row` suffixes the names in
    /// batch commands.
    pub fn bind(&self, entity: &E, command: &mut DbCommand, row: Option<usize>) -> MapResult<()> {
        for binder in &self.fields {
            let value = binder.value(entity)?;
            command.set(
                parameter_name(&binder.field, row),
                value,
                Some(binder.field.value_type()),
            );
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Writes a returned key back onto an entity.
pub struct KeySetter<E> {
    field: DbField,
    setter: Setter<E>,
    handler: Option<Arc<dyn PropertyHandler>>,
}

impl<E: 'static> KeySetter<E> {
    pub fn compile(
        map: &EntityMap<E>,
        key: &DbField,
        handlers: &HandlerRegistry,
    ) -> MapResult<Self> {
        let property = map.property_for_column(key.name()).ok_or_else(|| {
            MapError::compile(format!(
                "no property of '{}' maps to key column '{}'",
                map.entity(),
                key.name()
            ))
        })?;
        let setter = property.setter().ok_or_else(|| {
            MapError::compile(format!(
                "property '{}' of '{}' has no setter for the returned key",
                property.name(),
                map.entity()
            ))
        })?;
        Ok(Self {
            field: key.clone(),
            setter,
            handler: handlers.get::<E>(property.name()),
        })
    }
}

impl<E> KeySetter<E> {
    pub fn field(&self) -> &DbField {
        &self.field
    }

    pub fn apply(&self, entity: &mut E, value: Value) -> MapResult<()> {
        let value = match &self.handler {
            Some(handler) => handler.from_db(value, &self.field)?,
            None => value,
        };
        (self.setter)(entity, value)
    }
}
