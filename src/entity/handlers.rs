//! Per-property value conversion hooks.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::MapResult;
use crate::schema::DbField;
use crate::value::Value;

/// Custom translation between a property value and its column value.
pub trait PropertyHandler: Send + Sync {
    /// Value written into a command parameter.
    fn to_db(&self, value: Value, field: &DbField) -> MapResult<Value>;

    /// Value read back from the database (generated keys).
    fn from_db(&self, value: Value, field: &DbField) -> MapResult<Value> {
        let _ = field;
        Ok(value)
    }
}

/// Handlers keyed by (entity type, property name).
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<(TypeId, String), Arc<dyn PropertyHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `property` of entity type `E`.
    pub fn register<E: 'static>(
        mut self,
        property: impl Into<String>,
        handler: impl PropertyHandler + 'static,
    ) -> Self {
        self.handlers
            .insert((TypeId::of::<E>(), property.into()), Arc::new(handler));
        self
    }

    pub fn get<E: 'static>(&self, property: &str) -> Option<Arc<dyn PropertyHandler>> {
        self.handlers
            .get(&(TypeId::of::<E>(), property.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
