//! Entity metadata.
//!
//! Every mapped type describes itself once through [`Entity::describe`]: its
//! table and an accessor table of properties. The accessors are plain
//! function pointers so binding never goes through reflection. The
//! [`entity!`](crate::entity!) macro writes the description for a struct.

use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use strsim::levenshtein;

use crate::config::EnumRepr;
use crate::error::{MapError, MapResult};
use crate::value::{Value, ValueType};

pub mod handlers;
mod macros;

pub use handlers::{HandlerRegistry, PropertyHandler};

/// Reads a property off an entity.
pub type Getter<E> = fn(&E) -> Value;

/// Writes a database value back onto an entity.
pub type Setter<E> = fn(&mut E, Value) -> MapResult<()>;

/// One mapped property of an entity type.
pub struct PropertyMap<E> {
    name: &'static str,
    column: &'static str,
    value_type: ValueType,
    conversion: Option<EnumRepr>,
    getter: Getter<E>,
    setter: Option<Setter<E>>,
}

impl<E> Clone for PropertyMap<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            column: self.column,
            value_type: self.value_type,
            conversion: self.conversion,
            getter: self.getter,
            setter: self.setter,
        }
    }
}

impl<E> std::fmt::Debug for PropertyMap<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyMap")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("value_type", &self.value_type)
            .field("conversion", &self.conversion)
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

impl<E> PropertyMap<E> {
    /// A read-only property mapped to `column`.
    pub fn new(
        name: &'static str,
        column: &'static str,
        value_type: ValueType,
        getter: Getter<E>,
    ) -> Self {
        Self {
            name,
            column,
            value_type,
            conversion: None,
            getter,
            setter: None,
        }
    }

    pub fn with_setter(mut self, setter: Setter<E>) -> Self {
        self.setter = Some(setter);
        self
    }

    /// Fix how enum values of this property reach the database.
    pub fn with_conversion(mut self, repr: EnumRepr) -> Self {
        self.conversion = Some(repr);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn conversion(&self) -> Option<EnumRepr> {
        self.conversion
    }

    pub fn getter(&self) -> Getter<E> {
        self.getter
    }

    pub fn setter(&self) -> Option<Setter<E>> {
        self.setter
    }

    pub fn get(&self, entity: &E) -> Value {
        (self.getter)(entity)
    }

    /// Convert a value to the representation stored in this property's
    /// column. Only enum values (and lists of them) change.
    pub fn to_column_value(&self, value: Value, default_repr: EnumRepr) -> Value {
        let repr = self.conversion.unwrap_or(default_repr);
        convert_enum(value, repr)
    }
}

/// Apply an enum representation to a value.
pub fn convert_enum(value: Value, repr: EnumRepr) -> Value {
    match value {
        Value::Enum(e) => match repr {
            EnumRepr::Name => Value::Text(e.name),
            EnumRepr::Number => Value::Int(e.number),
        },
        Value::List(items) => {
            Value::List(items.into_iter().map(|v| convert_enum(v, repr)).collect())
        }
        other => other,
    }
}

/// The accessor table of an entity type.
pub struct EntityMap<E> {
    entity: &'static str,
    table: &'static str,
    properties: Vec<PropertyMap<E>>,
}

impl<E> std::fmt::Debug for EntityMap<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMap")
            .field("entity", &self.entity)
            .field("table", &self.table)
            .field("properties", &self.properties)
            .finish()
    }
}

impl<E> EntityMap<E> {
    pub fn new(entity: &'static str, table: &'static str, properties: Vec<PropertyMap<E>>) -> Self {
        Self {
            entity,
            table,
            properties,
        }
    }

    /// Type name used in error messages.
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Default table of the entity.
    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn properties(&self) -> &[PropertyMap<E>] {
        &self.properties
    }

    /// Look up a property by its name.
    pub fn property(&self, name: &str) -> Option<&PropertyMap<E>> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Look up a property by the column it maps to (case-insensitive).
    pub fn property_for_column(&self, column: &str) -> Option<&PropertyMap<E>> {
        self.properties
            .iter()
            .find(|p| p.column.eq_ignore_ascii_case(column))
    }

    /// Resolve a member of a filter expression.
    pub fn resolve(&self, member: &str) -> MapResult<&PropertyMap<E>> {
        self.property(member)
            .ok_or_else(|| MapError::PropertyNotFound {
                entity: self.entity.to_string(),
                member: member.to_string(),
                suggestion: self.did_you_mean(member),
            })
    }

    /// Mapped column names in declaration order.
    pub fn columns(&self) -> Vec<&'static str> {
        self.properties.iter().map(|p| p.column).collect()
    }

    fn did_you_mean(&self, input: &str) -> Option<String> {
        let threshold = match input.len() {
            0..=2 => 0,
            3..=5 => 2,
            _ => 3,
        };
        self.properties
            .iter()
            .map(|p| (levenshtein(input, p.name), p.name))
            .filter(|(dist, _)| *dist <= threshold)
            .min_by_key(|(dist, _)| *dist)
            .map(|(_, name)| name.to_string())
    }
}

/// A type mapped to a table.
pub trait Entity: Sized + 'static {
    /// Build the accessor table. Called once per type; use
    /// [`entity_map`] to get the shared copy.
    fn describe() -> EntityMap<Self>;
}

type SharedMap = Arc<dyn Any + Send + Sync>;

static ENTITY_MAPS: OnceLock<DashMap<TypeId, SharedMap>> = OnceLock::new();

/// The shared accessor table of `E`, built on first use.
pub fn entity_map<E: Entity>() -> Arc<EntityMap<E>> {
    let maps = ENTITY_MAPS.get_or_init(DashMap::new);
    let key = TypeId::of::<E>();

    if let Some(found) = maps.get(&key).and_then(|entry| entry.value().clone().downcast().ok()) {
        return found;
    }

    let built = Arc::new(E::describe());
    tracing::debug!("Mapped entity '{}' to table '{}'", built.entity, built.table);
    let shared = maps
        .entry(key)
        .or_insert_with(|| built.clone() as SharedMap)
        .value()
        .clone();
    shared.downcast().unwrap_or(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{EnumValue, FromValue};

    struct Account {
        id: i64,
        owner: String,
    }

    impl Entity for Account {
        fn describe() -> EntityMap<Self> {
            EntityMap::new(
                "Account",
                "Accounts",
                vec![
                    PropertyMap::new("Id", "AccountId", ValueType::Int64, |a: &Account| {
                        a.id.into()
                    }),
                    PropertyMap::new("Owner", "Owner", ValueType::Text, |a: &Account| {
                        a.owner.clone().into()
                    })
                    .with_setter(|a: &mut Account, v| {
                        a.owner = String::from_value(v)?;
                        Ok(())
                    }),
                ],
            )
        }
    }

    #[test]
    fn test_map_is_shared() {
        let a = entity_map::<Account>();
        let b = entity_map::<Account>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.table(), "Accounts");
        assert_eq!(a.columns(), vec!["AccountId", "Owner"]);
    }

    #[test]
    fn test_accessors() {
        let map = entity_map::<Account>();
        let mut account = Account {
            id: 3,
            owner: "ann".to_string(),
        };
        let id = map.property_for_column("accountid").unwrap();
        assert_eq!(id.get(&account), Value::Int(3));
        assert!(id.setter().is_none());

        let owner = map.property("Owner").unwrap();
        (owner.setter().unwrap())(&mut account, Value::from("bob")).unwrap();
        assert_eq!(account.owner, "bob");
    }

    #[test]
    fn test_resolve_suggests_close_names() {
        let map = entity_map::<Account>();
        match map.resolve("Ownr").unwrap_err() {
            MapError::PropertyNotFound {
                entity, suggestion, ..
            } => {
                assert_eq!(entity, "Account");
                assert_eq!(suggestion.as_deref(), Some("Owner"));
            }
            other => panic!("unexpected error: {other}"),
        }
        match map.resolve("Balance").unwrap_err() {
            MapError::PropertyNotFound { suggestion, .. } => assert!(suggestion.is_none()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_convert_enum() {
        let v = Value::Enum(EnumValue::new("Active", 1));
        assert_eq!(convert_enum(v.clone(), EnumRepr::Name), Value::from("Active"));
        assert_eq!(convert_enum(v, EnumRepr::Number), Value::Int(1));
        assert_eq!(convert_enum(Value::Int(7), EnumRepr::Name), Value::Int(7));
    }
}
