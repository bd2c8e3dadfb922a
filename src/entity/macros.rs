//! Declarative mapping macros.

/// Map a struct to a table.
///
/// Each property lists the struct field, its type and the property name
/// used in filters. The column defaults to the property name and can be
/// overridden with `as "column"`. Flags in brackets tune the property:
/// `[read_only]` drops the setter, `[enum Name]` / `[enum Number]` fix the
/// enum representation.
///
/// Besides the [`Entity`](crate::entity::Entity) impl, one typed column
/// accessor is generated per property for the filter DSL.
///
/// ```ignore
/// entity! {
///     Person => "Person" {
///         id: i64 => "Id",
///         name: String => "Name",
///         nick: Option<String> => "Nick" as "nick_name",
///         status: Status => "Status" [enum Number],
///     }
/// }
///
/// let filter = Person::name().starts_with("Jo") & Person::id().gt(10);
/// ```
#[macro_export]
macro_rules! entity {
    (
        $entity:ident => $table:literal {
            $(
                $field:ident : $ty:ty => $prop:literal
                $( as $col:literal )?
                $( [ $($flag:tt)* ] )?
            ),* $(,)?
        }
    ) => {
        impl $crate::entity::Entity for $entity {
            fn describe() -> $crate::entity::EntityMap<Self> {
                $crate::entity::EntityMap::new(
                    stringify!($entity),
                    $table,
                    vec![
                        $(
                            $crate::__entity_property!(
                                $entity, $field, $ty, $prop,
                                $crate::__entity_column!($prop $(, $col)?),
                                [ $( $($flag)* )? ]
                            )
                        ),*
                    ],
                )
            }
        }

        #[allow(dead_code)]
        impl $entity {
            $(
                pub fn $field() -> $crate::expr::TypedColumn<$entity, $ty> {
                    $crate::expr::TypedColumn::new($prop)
                }
            )*
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __entity_column {
    ($prop:literal) => {
        $prop
    };
    ($prop:literal, $col:literal) => {
        $col
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __entity_property {
    ($entity:ident, $field:ident, $ty:ty, $prop:literal, $col:expr, []) => {
        $crate::__entity_property!(@base $entity, $field, $ty, $prop, $col)
            .with_setter(|e: &mut $entity, v: $crate::value::Value| {
                e.$field = <$ty as $crate::value::FromValue>::from_value(v)?;
                Ok(())
            })
    };
    ($entity:ident, $field:ident, $ty:ty, $prop:literal, $col:expr, [read_only]) => {
        $crate::__entity_property!(@base $entity, $field, $ty, $prop, $col)
    };
    ($entity:ident, $field:ident, $ty:ty, $prop:literal, $col:expr, [enum $repr:ident]) => {
        $crate::__entity_property!($entity, $field, $ty, $prop, $col, [])
            .with_conversion($crate::config::EnumRepr::$repr)
    };
    (@base $entity:ident, $field:ident, $ty:ty, $prop:literal, $col:expr) => {
        $crate::entity::PropertyMap::new(
            $prop,
            $col,
            <$ty as $crate::value::HasValueType>::VALUE_TYPE,
            |e: &$entity| $crate::value::Value::from(::core::clone::Clone::clone(&e.$field)),
        )
    };
}

/// Declare a fieldless enum usable as a mapped property.
///
/// Every variant needs an explicit discriminant; the variant name and the
/// discriminant are both carried so the column representation can be chosen
/// per property.
#[macro_export]
macro_rules! db_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident = $number:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $variant = $number ),+
        }

        impl From<$name> for $crate::value::Value {
            fn from(v: $name) -> Self {
                match v {
                    $( $name::$variant => $crate::value::Value::Enum(
                        $crate::value::EnumValue::new(stringify!($variant), $number),
                    ), )+
                }
            }
        }

        impl $crate::value::FromValue for $name {
            fn from_value(value: $crate::value::Value) -> $crate::error::MapResult<Self> {
                match &value {
                    $(
                        $crate::value::Value::Text(s) if s == stringify!($variant) => {
                            Ok($name::$variant)
                        }
                    )+
                    $( $crate::value::Value::Int(n) if *n == $number => Ok($name::$variant), )+
                    $crate::value::Value::Enum(e) => match e.name.as_str() {
                        $( stringify!($variant) => Ok($name::$variant), )+
                        _ => Err($crate::error::MapError::Conversion {
                            expected: stringify!($name),
                            found: e.name.clone(),
                        }),
                    },
                    other => Err($crate::error::MapError::Conversion {
                        expected: stringify!($name),
                        found: other.to_string(),
                    }),
                }
            }
        }

        impl $crate::value::HasValueType for $name {
            const VALUE_TYPE: $crate::value::ValueType = $crate::value::ValueType::Enum;
        }

        impl $crate::expr::ColumnValue<$name> for $name {}
    };
}
