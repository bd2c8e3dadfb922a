//! Typed filter builders.
//!
//! `TypedColumn<E, T>` names a property of entity `E` holding a `T`. Value
//! arguments are checked against `T` through [`ColumnValue`], so comparing an
//! integer column with a string does not compile.
//!
//! ```ignore
//! let filter = Person::name().starts_with("Jo") & Person::age().gte(18);
//! ```

use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr, Not};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{CompareOp, Expr, Method};
use crate::value::Value;

/// Marker trait for value types that match a column type.
pub trait ColumnValue<C> {}

impl ColumnValue<i64> for i64 {}
impl ColumnValue<i64> for i32 {}
impl ColumnValue<i64> for i16 {}
impl ColumnValue<i32> for i32 {}
impl ColumnValue<i32> for i16 {}
impl ColumnValue<i16> for i16 {}

impl ColumnValue<f64> for f64 {}
impl ColumnValue<f64> for f32 {}
impl ColumnValue<f64> for i32 {}
impl ColumnValue<f32> for f32 {}

impl ColumnValue<Decimal> for Decimal {}
impl ColumnValue<Decimal> for i64 {}
impl ColumnValue<Decimal> for i32 {}

impl ColumnValue<String> for String {}
impl ColumnValue<String> for &str {}
impl ColumnValue<String> for &String {}

impl ColumnValue<bool> for bool {}

impl ColumnValue<Uuid> for Uuid {}
impl ColumnValue<NaiveDateTime> for NaiveDateTime {}
impl ColumnValue<NaiveDate> for NaiveDate {}
impl ColumnValue<NaiveTime> for NaiveTime {}
impl ColumnValue<Vec<u8>> for Vec<u8> {}
impl ColumnValue<serde_json::Value> for serde_json::Value {}

// Nullable columns accept the values of their inner type.
impl<T, V: ColumnValue<T>> ColumnValue<Option<T>> for V {}

/// Column types that support the string helpers.
pub trait TextColumn {}

impl TextColumn for String {}
impl TextColumn for Option<String> {}

/// A typed property reference of entity `E`.
pub struct TypedColumn<E, T> {
    name: &'static str,
    _phantom: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Clone for TypedColumn<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for TypedColumn<E, T> {}

impl<E, T> std::fmt::Debug for TypedColumn<E, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypedColumn").field(&self.name).finish()
    }
}

impl<E, T> TypedColumn<E, T> {
    /// Create a new typed column.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    /// Property name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub fn expr(&self) -> Expr {
        Expr::Member(self.name.to_string())
    }

    fn compare<V: ColumnValue<T> + Into<Value>>(&self, op: CompareOp, value: V) -> Filter<E> {
        Filter::new(Expr::compare(op, self.expr(), Expr::Constant(value.into())))
    }

    pub fn eq<V: ColumnValue<T> + Into<Value>>(&self, value: V) -> Filter<E> {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne<V: ColumnValue<T> + Into<Value>>(&self, value: V) -> Filter<E> {
        self.compare(CompareOp::Ne, value)
    }

    pub fn gt<V: ColumnValue<T> + Into<Value>>(&self, value: V) -> Filter<E> {
        self.compare(CompareOp::Gt, value)
    }

    pub fn lt<V: ColumnValue<T> + Into<Value>>(&self, value: V) -> Filter<E> {
        self.compare(CompareOp::Lt, value)
    }

    pub fn gte<V: ColumnValue<T> + Into<Value>>(&self, value: V) -> Filter<E> {
        self.compare(CompareOp::Ge, value)
    }

    pub fn lte<V: ColumnValue<T> + Into<Value>>(&self, value: V) -> Filter<E> {
        self.compare(CompareOp::Le, value)
    }

    pub fn is_null(&self) -> Filter<E> {
        Filter::new(Expr::compare(CompareOp::Eq, self.expr(), Expr::Constant(Value::Null)))
    }

    pub fn is_not_null(&self) -> Filter<E> {
        Filter::new(Expr::compare(CompareOp::Ne, self.expr(), Expr::Constant(Value::Null)))
    }

    /// `values.Contains(x.Prop)`: the property is one of `values`.
    pub fn in_list<V, I>(&self, values: I) -> Filter<E>
    where
        V: ColumnValue<T> + Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Filter::new(Expr::call(
            Method::Contains,
            Expr::Constant(Value::list(values)),
            vec![self.expr()],
        ))
    }

    /// `(x.Prop ?? fallback)`, to be compared with [`CoalesceColumn::eq`].
    pub fn coalesce<V: ColumnValue<T> + Into<Value>>(&self, fallback: V) -> CoalesceColumn<E> {
        CoalesceColumn {
            expr: Expr::Coalesce {
                value: Box::new(self.expr()),
                fallback: Box::new(Expr::Constant(fallback.into())),
            },
            _phantom: PhantomData,
        }
    }

    /// `values.All(v => x.Prop == v)`: one equality per element, all of them.
    pub fn eq_all<V, I>(&self, values: I) -> Filter<E>
    where
        V: ColumnValue<T> + Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.per_element(Method::All, values, |column, v| {
            Expr::compare(CompareOp::Eq, column, v)
        })
    }

    /// `values.Any(v => x.Prop == v)`: one equality per element, any of them.
    pub fn eq_any<V, I>(&self, values: I) -> Filter<E>
    where
        V: ColumnValue<T> + Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.per_element(Method::Any, values, |column, v| {
            Expr::compare(CompareOp::Eq, column, v)
        })
    }

    fn per_element<V, I>(
        &self,
        method: Method,
        values: I,
        body: fn(Expr, Expr) -> Expr,
    ) -> Filter<E>
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let lambda = Expr::lambda("v", body(self.expr(), Expr::Parameter("v".to_string())));
        Filter::new(Expr::call(
            method,
            Expr::Constant(Value::list(values)),
            vec![lambda],
        ))
    }
}

impl<E, T: TextColumn> TypedColumn<E, T> {
    fn text_call(&self, method: Method, value: &str) -> Filter<E> {
        Filter::new(Expr::call(method, self.expr(), vec![Expr::constant(value)]))
    }

    /// `LIKE '%value%'`
    pub fn contains(&self, value: &str) -> Filter<E> {
        self.text_call(Method::Contains, value)
    }

    /// `LIKE 'value%'`
    pub fn starts_with(&self, value: &str) -> Filter<E> {
        self.text_call(Method::StartsWith, value)
    }

    /// `LIKE '%value'`
    pub fn ends_with(&self, value: &str) -> Filter<E> {
        self.text_call(Method::EndsWith, value)
    }

    pub fn equals(&self, value: &str) -> Filter<E> {
        self.text_call(Method::Equals, value)
    }

    pub fn equals_ignore_case(&self, value: &str) -> Filter<E> {
        self.text_call(Method::EqualsIgnoreCase, value)
    }

    /// The property contains every one of `values` (one LIKE per element).
    pub fn contains_all<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> Filter<E> {
        self.per_element(Method::All, values, |column, v| {
            Expr::call(Method::Contains, column, vec![v])
        })
    }

    /// The property contains at least one of `values`.
    pub fn contains_any<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> Filter<E> {
        self.per_element(Method::Any, values, |column, v| {
            Expr::call(Method::Contains, column, vec![v])
        })
    }

    /// The property starts with at least one of `values`.
    pub fn starts_with_any<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> Filter<E> {
        self.per_element(Method::Any, values, |column, v| {
            Expr::call(Method::StartsWith, column, vec![v])
        })
    }
}

impl<E> TypedColumn<E, bool> {
    /// `x.Flag`
    pub fn is_true(&self) -> Filter<E> {
        Filter::new(self.expr())
    }

    /// `!x.Flag`
    pub fn is_false(&self) -> Filter<E> {
        Filter::new(self.expr().negate())
    }
}

/// A coalesced property awaiting its comparison.
pub struct CoalesceColumn<E> {
    expr: Expr,
    _phantom: PhantomData<fn() -> E>,
}

impl<E> CoalesceColumn<E> {
    pub fn eq(self, value: impl Into<Value>) -> Filter<E> {
        Filter::new(Expr::compare(CompareOp::Eq, self.expr, Expr::Constant(value.into())))
    }

    pub fn ne(self, value: impl Into<Value>) -> Filter<E> {
        Filter::new(Expr::compare(CompareOp::Ne, self.expr, Expr::Constant(value.into())))
    }
}

/// A boolean expression over entity `E`.
pub struct Filter<E> {
    expr: Expr,
    _phantom: PhantomData<fn() -> E>,
}

impl<E> Clone for Filter<E> {
    fn clone(&self) -> Self {
        Filter::new(self.expr.clone())
    }
}

impl<E> std::fmt::Debug for Filter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Filter").field(&self.expr).finish()
    }
}

impl<E> std::fmt::Display for Filter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expr)
    }
}

impl<E> Filter<E> {
    /// Wrap an untyped expression.
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            _phantom: PhantomData,
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    pub fn and(self, other: Filter<E>) -> Filter<E> {
        Filter::new(self.expr.and(other.expr))
    }

    pub fn or(self, other: Filter<E>) -> Filter<E> {
        Filter::new(self.expr.or(other.expr))
    }
}

impl<E> BitAnd for Filter<E> {
    type Output = Filter<E>;

    fn bitand(self, rhs: Filter<E>) -> Filter<E> {
        self.and(rhs)
    }
}

impl<E> BitOr for Filter<E> {
    type Output = Filter<E>;

    fn bitor(self, rhs: Filter<E>) -> Filter<E> {
        self.or(rhs)
    }
}

impl<E> Not for Filter<E> {
    type Output = Filter<E>;

    fn not(self) -> Filter<E> {
        Filter::new(self.expr.negate())
    }
}
