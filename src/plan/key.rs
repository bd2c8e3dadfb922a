//! Structural plan keys.

use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashSet;

use crate::transpiler::{Dialect, Operation, OrderField};

/// Shared string pool for table, field and hint names.
#[derive(Debug, Default)]
pub struct KeyInterner {
    names: DashSet<Arc<str>>,
}

impl KeyInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pooled copy of `name`.
    pub fn intern(&self, name: &str) -> Arc<str> {
        if let Some(found) = self.names.get(name) {
            return found.key().clone();
        }
        let name: Arc<str> = Arc::from(name);
        self.names.insert(name.clone());
        self.names
            .get(&*name)
            .map(|found| found.key().clone())
            .unwrap_or(name)
    }

    pub fn intern_all<S: AsRef<str>>(&self, names: &[S]) -> Arc<[Arc<str>]> {
        names.iter().map(|n| self.intern(n.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Everything that changes the compiled plan of an entity type.
///
/// Filter values are not part of the key; only the filter's shape is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    pub entity: TypeId,
    pub dialect: Dialect,
    pub operation: Operation,
    pub table: Arc<str>,
    pub fields: Arc<[Arc<str>]>,
    pub qualifiers: Option<Arc<[Arc<str>]>>,
    pub hints: Option<Arc<str>>,
    pub order_by: Vec<OrderField>,
    pub predicate_shape: Option<u64>,
}
