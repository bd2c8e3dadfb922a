//! Expression to predicate compilation.

use crate::config::{EngineOptions, EnumRepr, NullSemantics};
use crate::entity::{Entity, EntityMap, PropertyMap, entity_map};
use crate::error::{MapError, MapResult};
use crate::predicate::{Conjunction, Field, Operator, Predicate, PredicateGroup, PredicateNode};
use crate::value::{Value, ValueType};

use super::{CompareOp, Expr, Filter, Method};

/// Compiles filter expressions over an entity type into predicate groups.
///
/// Compilation is a pure function of the expression, the entity metadata and
/// the options given at construction.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionCompiler {
    null_semantics: NullSemantics,
    enum_repr: EnumRepr,
}

impl Default for ExpressionCompiler {
    fn default() -> Self {
        Self::new(&EngineOptions::default())
    }
}

impl ExpressionCompiler {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            null_semantics: options.null_semantics,
            enum_repr: options.enum_repr,
        }
    }

    /// Compile a typed filter.
    pub fn compile_filter<E: Entity>(&self, filter: &Filter<E>) -> MapResult<PredicateGroup> {
        self.compile::<E>(filter.expr())
    }

    /// Compile an untyped expression against the properties of `E`.
    pub fn compile<E: Entity>(&self, expr: &Expr) -> MapResult<PredicateGroup> {
        let map = entity_map::<E>();
        let scope = Scope {
            compiler: self,
            map: &map,
        };
        let group = match scope.compile(expr)? {
            Predicate::Group(group) => group,
            Predicate::Node(node) => PredicateGroup::single(node),
        };
        tracing::trace!("Compiled filter {} for '{}'", expr, map.entity());
        Ok(group)
    }

    /// Parse and compile a textual filter such as
    /// `x => x.Name.StartsWith("Jo") && x.Age >= 18`.
    pub fn compile_text<E: Entity>(&self, text: &str) -> MapResult<PredicateGroup> {
        let expr = super::parse_filter(text)?;
        self.compile::<E>(&expr)
    }
}

struct Scope<'a, E> {
    compiler: &'a ExpressionCompiler,
    map: &'a EntityMap<E>,
}

fn unsupported(expr: &Expr) -> MapError {
    MapError::UnsupportedExpression(expr.to_string())
}

impl<E> Scope<'_, E> {
    fn compile(&self, expr: &Expr) -> MapResult<Predicate> {
        match expr {
            Expr::Member(name) => {
                let (prop, field) = self.property(name)?;
                if prop.value_type() != ValueType::Bool {
                    return Err(unsupported(expr));
                }
                Ok(PredicateNode::new(field, Operator::Equal, true).into())
            }
            Expr::Compare { op, left, right } => self.compare(expr, *op, left, right),
            Expr::And(l, r) => self.combine(Conjunction::And, l, r),
            Expr::Or(l, r) => self.combine(Conjunction::Or, l, r),
            Expr::Not(inner) => self.negate(inner),
            Expr::Call {
                method,
                target,
                args,
            } => self.call(expr, *method, target, args),
            _ => Err(unsupported(expr)),
        }
    }

    fn property(&self, member: &str) -> MapResult<(&PropertyMap<E>, Field)> {
        let prop = self.map.resolve(member)?;
        Ok((prop, Field::typed(prop.column(), prop.value_type())))
    }

    fn convert(&self, prop: &PropertyMap<E>, value: Value) -> Value {
        prop.to_column_value(value, self.compiler.enum_repr)
    }

    fn combine(&self, conjunction: Conjunction, left: &Expr, right: &Expr) -> MapResult<Predicate> {
        let mut items = Vec::new();
        for side in [left, right] {
            match self.compile(side)? {
                Predicate::Group(group)
                    if group.conjunction() == conjunction && !group.is_negated() =>
                {
                    items.extend(group.items().iter().cloned());
                }
                other => items.push(other),
            }
        }
        Ok(PredicateGroup::new(conjunction, items).into())
    }

    fn negate(&self, inner: &Expr) -> MapResult<Predicate> {
        if let Expr::Member(name) = inner {
            let (prop, field) = self.property(name)?;
            if prop.value_type() != ValueType::Bool {
                return Err(unsupported(&Expr::Not(Box::new(inner.clone()))));
            }
            return Ok(PredicateNode::new(field, Operator::Equal, false).into());
        }

        Ok(match self.compile(inner)? {
            Predicate::Node(node) => Predicate::Node(node.negate()),
            Predicate::Group(group) => Predicate::Group(group.negate()),
        })
    }

    fn compare(
        &self,
        expr: &Expr,
        op: CompareOp,
        left: &Expr,
        right: &Expr,
    ) -> MapResult<Predicate> {
        let (subject, op, value) = match (left, right) {
            (Expr::Member(_) | Expr::Coalesce { .. }, Expr::Constant(v)) => {
                (left, op.to_operator(), v)
            }
            (Expr::Constant(v), Expr::Member(_) | Expr::Coalesce { .. }) => {
                (right, op.to_operator().mirror(), v)
            }
            _ => return Err(unsupported(expr)),
        };

        match subject {
            Expr::Member(name) => self.compare_member(expr, name, op, value.clone()),
            Expr::Coalesce { value: inner, fallback } => {
                self.compare_coalesce(expr, inner, fallback, op, value)
            }
            _ => Err(unsupported(expr)),
        }
    }

    fn compare_member(
        &self,
        expr: &Expr,
        name: &str,
        op: Operator,
        value: Value,
    ) -> MapResult<Predicate> {
        let (prop, field) = self.property(name)?;

        if value.is_null() {
            return match op {
                Operator::Equal => Ok(PredicateNode::is_null(field).into()),
                Operator::NotEqual => Ok(PredicateNode::is_not_null(field).into()),
                _ => Err(unsupported(expr)),
            };
        }

        let node = PredicateNode::new(field.clone(), op, self.convert(prop, value));
        match (self.compiler.null_semantics, op) {
            (NullSemantics::ThreeValued, Operator::NotEqual) => {
                Ok(PredicateGroup::or([node, PredicateNode::is_null(field)]).into())
            }
            (NullSemantics::ThreeValued, Operator::Equal) => {
                Ok(PredicateGroup::and([node, PredicateNode::is_not_null(field)]).into())
            }
            _ => Ok(node.into()),
        }
    }

    /// `(x.P ?? fallback) == value` holds for rows where P equals value, and
    /// for NULL rows only when the fallback is that same value.
    fn compare_coalesce(
        &self,
        expr: &Expr,
        inner: &Expr,
        fallback: &Expr,
        op: Operator,
        value: &Value,
    ) -> MapResult<Predicate> {
        let (Expr::Member(name), Expr::Constant(fallback)) = (inner, fallback) else {
            return Err(unsupported(expr));
        };
        if op != Operator::Equal || value.is_null() || fallback != value {
            return Err(unsupported(expr));
        }

        let (prop, field) = self.property(name)?;
        let value = self.convert(prop, value.clone());
        let node = PredicateNode::new(field.clone(), Operator::Equal, value);
        Ok(PredicateGroup::or([node, PredicateNode::is_null(field)]).into())
    }

    fn call(
        &self,
        expr: &Expr,
        method: Method,
        target: &Expr,
        args: &[Expr],
    ) -> MapResult<Predicate> {
        if matches!(method, Method::All | Method::Any) {
            return self.per_element(expr, method, target, args);
        }

        let [arg] = args else {
            return Err(unsupported(expr));
        };

        match (method, target, arg) {
            // values.Contains(x.Prop)
            (Method::Contains, Expr::Constant(Value::List(items)), Expr::Member(name)) => {
                let (prop, field) = self.property(name)?;
                let values = self.convert(prop, Value::List(items.clone()));
                Ok(PredicateNode::new(field, Operator::In, values).into())
            }
            (
                Method::Contains | Method::StartsWith | Method::EndsWith,
                Expr::Member(name),
                Expr::Constant(Value::Text(text)),
            ) => {
                let (_, field) = self.property(name)?;
                let pattern = match method {
                    Method::Contains => format!("%{}%", text),
                    Method::StartsWith => format!("{}%", text),
                    _ => format!("%{}", text),
                };
                Ok(PredicateNode::new(field, Operator::Like, pattern).into())
            }
            (Method::Equals | Method::EqualsIgnoreCase, Expr::Member(name), Expr::Constant(value))
            | (
                Method::Equals | Method::EqualsIgnoreCase,
                Expr::Constant(value),
                Expr::Member(name),
            ) => {
                if value.is_null() {
                    return Err(unsupported(expr));
                }
                let (prop, field) = self.property(name)?;
                let value = self.convert(prop, value.clone());
                let node = PredicateNode::new(field, Operator::Equal, value);
                Ok(if method == Method::EqualsIgnoreCase {
                    node.ignore_case()
                } else {
                    node
                }
                .into())
            }
            _ => Err(unsupported(expr)),
        }
    }

    /// `values.All(v => ...)` / `values.Any(v => ...)`: one predicate per
    /// element, joined with AND / OR.
    fn per_element(
        &self,
        expr: &Expr,
        method: Method,
        target: &Expr,
        args: &[Expr],
    ) -> MapResult<Predicate> {
        let (Expr::Constant(Value::List(items)), [Expr::Lambda { param, body }]) = (target, args)
        else {
            return Err(unsupported(expr));
        };

        if items.is_empty() {
            // All over nothing holds, Any over nothing does not.
            let name = body.first_member().ok_or_else(|| unsupported(expr))?;
            let (_, field) = self.property(name)?;
            let op = if method == Method::All {
                Operator::NotIn
            } else {
                Operator::In
            };
            return Ok(PredicateNode::new(field, op, Value::List(Vec::new())).into());
        }

        let conjunction = if method == Method::All {
            Conjunction::And
        } else {
            Conjunction::Or
        };
        let parts = items
            .iter()
            .map(|item| self.compile(&body.substitute(param, item)))
            .collect::<MapResult<Vec<_>>>()?;
        Ok(PredicateGroup::new(conjunction, parts).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::TypedColumn;
    use crate::value::EnumValue;
    use pretty_assertions::assert_eq;

    crate::db_enum! {
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum Level {
            Low = 1,
            High = 2,
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Person {
        id: i64,
        name: String,
        nick: Option<String>,
        age: i32,
        active: bool,
        level: Option<Level>,
        rank: Option<Level>,
    }

    crate::entity! {
        Person => "Person" {
            id: i64 => "Id",
            name: String => "Name",
            nick: Option<String> => "Nick" as "nick_name",
            age: i32 => "Age",
            active: bool => "Active",
            level: Option<Level> => "Level",
            rank: Option<Level> => "Rank" [enum Number],
        }
    }

    fn compile(filter: Filter<Person>) -> PredicateGroup {
        ExpressionCompiler::default().compile_filter(&filter).unwrap()
    }

    fn node(name: &str, vt: ValueType, op: Operator, value: impl Into<Value>) -> PredicateNode {
        PredicateNode::new(Field::typed(name, vt), op, value)
    }

    #[test]
    fn test_deterministic() {
        let make = || Person::name().eq("ann") & Person::age().gt(3);
        assert_eq!(compile(make()), compile(make()));
    }

    #[test]
    fn test_simple_comparison() {
        let group = compile(Person::age().gte(18));
        assert_eq!(
            group,
            PredicateGroup::single(node("Age", ValueType::Int32, Operator::GreaterOrEqual, 18))
        );
    }

    #[test]
    fn test_member_on_right_is_mirrored() {
        let expr = Expr::compare(CompareOp::Lt, Expr::constant(5), Expr::member("Age"));
        let group = ExpressionCompiler::default().compile::<Person>(&expr).unwrap();
        assert_eq!(group.nodes()[0].operator, Operator::GreaterThan);
    }

    #[test]
    fn test_null_two_valued() {
        let group = compile(Person::nick().is_null());
        assert_eq!(group.nodes()[0].operator, Operator::IsNull);
        assert_eq!(group.nodes()[0].field.name, "nick_name");

        let group = compile(Person::nick().is_not_null());
        assert_eq!(group.items().len(), 1);
        assert_eq!(group.nodes()[0].operator, Operator::IsNotNull);

        let group = compile(Person::nick().ne("x"));
        assert_eq!(group.nodes().len(), 1);
        assert_eq!(group.nodes()[0].operator, Operator::NotEqual);
    }

    #[test]
    fn test_null_three_valued() {
        let options = EngineOptions::builder()
            .null_semantics(NullSemantics::ThreeValued)
            .build()
            .unwrap();
        let compiler = ExpressionCompiler::new(&options);

        let group = compiler.compile_filter(&Person::nick().ne("x")).unwrap();
        let nick = |op, v: Value| node("nick_name", ValueType::Text, op, v);
        assert_eq!(
            group,
            PredicateGroup::or([
                nick(Operator::NotEqual, Value::from("x")),
                nick(Operator::IsNull, Value::Null),
            ])
        );

        let group = compiler.compile_filter(&Person::nick().eq("x")).unwrap();
        assert_eq!(
            group,
            PredicateGroup::and([
                nick(Operator::Equal, Value::from("x")),
                nick(Operator::IsNotNull, Value::Null),
            ])
        );

        // Null checks are unaffected.
        let group = compiler.compile_filter(&Person::nick().is_not_null()).unwrap();
        assert_eq!(group, PredicateGroup::single(nick(Operator::IsNotNull, Value::Null)));
    }

    #[test]
    fn test_coalesce_rewrite() {
        let group = compile(Person::nick().coalesce("n/a").eq("n/a"));
        assert_eq!(group.conjunction(), Conjunction::Or);
        let ops: Vec<_> = group.nodes().iter().map(|n| n.operator).collect();
        assert_eq!(ops, vec![Operator::Equal, Operator::IsNull]);
    }

    #[test]
    fn test_coalesce_rejected_when_fallback_differs() {
        let filter = Person::nick().coalesce("n/a").eq("other");
        let err = ExpressionCompiler::default().compile_filter(&filter).unwrap_err();
        assert!(matches!(err, MapError::UnsupportedExpression(ref text) if text.contains("??")));

        let filter = Person::nick().coalesce("n/a").ne("n/a");
        assert!(ExpressionCompiler::default().compile_filter(&filter).is_err());
    }

    #[test]
    fn test_like_patterns() {
        let like = |f: Filter<Person>| compile(f).nodes()[0].value.clone();
        assert_eq!(like(Person::name().contains("abc")), Value::from("%abc%"));
        assert_eq!(like(Person::name().starts_with("abc")), Value::from("abc%"));
        assert_eq!(like(Person::name().ends_with("abc")), Value::from("%abc"));
    }

    #[test]
    fn test_negated_like_and_in() {
        let group = compile(!Person::name().contains("a"));
        assert_eq!(group.nodes()[0].operator, Operator::NotLike);

        let group = compile(!Person::id().in_list([1i64, 2]));
        assert_eq!(group.nodes()[0].operator, Operator::NotIn);
        assert_eq!(group.nodes()[0].value, Value::list([1i64, 2]));
    }

    #[test]
    fn test_equals_ignore_case() {
        let group = compile(Person::name().equals_ignore_case("Ann"));
        assert!(!group.nodes()[0].case_sensitive);
        assert!(compile(Person::name().equals("Ann")).nodes()[0].case_sensitive);
    }

    #[test]
    fn test_boolean_member() {
        let group = compile(Person::active().is_true());
        assert_eq!(group.nodes()[0].value, Value::Bool(true));
        let group = compile(Person::active().is_false());
        assert_eq!(group.nodes()[0].value, Value::Bool(false));
        assert_eq!(group.nodes()[0].operator, Operator::Equal);
    }

    #[test]
    fn test_non_bool_member_rejected() {
        let expr = Expr::member("Age");
        let err = ExpressionCompiler::default().compile::<Person>(&expr).unwrap_err();
        assert!(matches!(err, MapError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_all_expands_per_element() {
        let group = compile(Person::name().contains_all(["a", "b", "c"]));
        assert_eq!(group.conjunction(), Conjunction::And);
        assert_eq!(group.nodes().len(), 3);
        assert!(group.nodes().iter().all(|n| n.operator == Operator::Like));
        assert_eq!(group.nodes()[2].value, Value::from("%c%"));
    }

    #[test]
    fn test_any_expands_per_element() {
        let group = compile(Person::age().eq_any([1, 2]));
        assert_eq!(group.conjunction(), Conjunction::Or);
        let ops: Vec<_> = group.nodes().iter().map(|n| n.operator).collect();
        assert_eq!(ops, vec![Operator::Equal, Operator::Equal]);
        assert!(group.nodes().iter().all(|n| n.operator != Operator::In));
    }

    #[test]
    fn test_any_inside_conjunction_stays_grouped() {
        let group = compile(Person::id().gt(0i64) & Person::name().starts_with_any(["a", "b"]));
        assert_eq!(group.items().len(), 2);
        match &group.items()[1] {
            Predicate::Group(inner) => assert_eq!(inner.conjunction(), Conjunction::Or),
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_any_matches_nothing() {
        let empty: [&str; 0] = [];
        let group = compile(Person::name().contains_any(empty));
        assert_eq!(group.nodes()[0].operator, Operator::In);
        assert_eq!(group.nodes()[0].value, Value::List(vec![]));

        let group = compile(Person::name().contains_all(empty));
        assert_eq!(group.nodes()[0].operator, Operator::NotIn);
    }

    #[test]
    fn test_flattening_and_negated_groups() {
        let group =
            compile(Person::id().gt(1i64) & Person::age().gt(2) & Person::active().is_true());
        assert_eq!(group.items().len(), 3);

        let group = compile(!(Person::id().gt(1i64) | Person::age().gt(2)));
        assert!(group.is_negated());
        assert_eq!(group.conjunction(), Conjunction::Or);
    }

    #[test]
    fn test_enum_conversion() {
        let group = compile(Person::level().eq(Level::High));
        assert_eq!(group.nodes()[0].value, Value::from("High"));

        let group = compile(Person::rank().eq(Level::High));
        assert_eq!(group.nodes()[0].value, Value::Int(2));

        let options = EngineOptions::builder().enum_repr(EnumRepr::Number).build().unwrap();
        let group = ExpressionCompiler::new(&options)
            .compile_filter(&Person::level().in_list([Level::Low, Level::High]))
            .unwrap();
        assert_eq!(group.nodes()[0].value, Value::list([1, 2]));
    }

    #[test]
    fn test_enum_constant_in_raw_expression() {
        let expr = Expr::compare(
            CompareOp::Eq,
            Expr::member("Rank"),
            Expr::Constant(Value::Enum(EnumValue::new("Low", 1))),
        );
        let group = ExpressionCompiler::default().compile::<Person>(&expr).unwrap();
        assert_eq!(group.nodes()[0].value, Value::Int(1));
    }

    #[test]
    fn test_property_not_found() {
        let column: TypedColumn<Person, String> = TypedColumn::new("Nmae");
        let err = ExpressionCompiler::default()
            .compile_filter(&column.eq("x"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Property 'Nmae' not found on 'Person'. Did you mean 'Name'?"
        );
    }

    #[test]
    fn test_unsupported_shapes() {
        let both_members = Expr::compare(CompareOp::Eq, Expr::member("Name"), Expr::member("Nick"));
        let err = ExpressionCompiler::default()
            .compile::<Person>(&both_members)
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported expression: x.Name == x.Nick");

        let null_gt =
            Expr::compare(CompareOp::Gt, Expr::member("Age"), Expr::Constant(Value::Null));
        assert!(ExpressionCompiler::default().compile::<Person>(&null_gt).is_err());
    }

    #[test]
    fn test_text_matches_dsl() {
        let compiler = ExpressionCompiler::default();
        let from_text = compiler
            .compile_text::<Person>(r#"x => x.Name.StartsWith("Jo") && x.Age >= 18"#)
            .unwrap();
        let from_dsl = compile(Person::name().starts_with("Jo") & Person::age().gte(18));
        assert_eq!(from_text, from_dsl);
    }
}
