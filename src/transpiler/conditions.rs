//! WHERE clause rendering.

use super::SqlDialect;
use super::traits::quote_name;
use crate::predicate::{Conjunction, Operator, Predicate, PredicateGroup, PredicateNode};
use crate::schema::DbField;

/// ` WHERE ...` for `group`, or an empty string when there is nothing to filter.
///
/// Parameter names come from [`PredicateGroup::parameter_names`] with the
/// same `reserved` set the binder uses.
pub fn render_where(
    dialect: &dyn SqlDialect,
    group: Option<&PredicateGroup>,
    reserved: &[String],
) -> String {
    match group {
        Some(group) if !group.is_empty() => {
            format!(" WHERE {}", render_group(dialect, group, reserved))
        }
        _ => String::new(),
    }
}

/// Render a group without the outer parentheses.
pub fn render_group(
    dialect: &dyn SqlDialect,
    group: &PredicateGroup,
    reserved: &[String],
) -> String {
    let names = group.parameter_names(reserved);
    let mut names = names.into_iter();
    render(dialect, group, &mut names, true)
}

fn render(
    dialect: &dyn SqlDialect,
    group: &PredicateGroup,
    names: &mut impl Iterator<Item = Vec<String>>,
    top: bool,
) -> String {
    let body = if group.is_empty() {
        match group.conjunction() {
            Conjunction::And => "1 = 1".to_string(),
            Conjunction::Or => "1 = 0".to_string(),
        }
    } else {
        let separator = format!(" {} ", group.conjunction().sql_keyword());
        group
            .items()
            .iter()
            .map(|item| match item {
                Predicate::Node(node) => {
                    let params = names.next().unwrap_or_default();
                    render_node(dialect, node, &params)
                }
                Predicate::Group(inner) => render(dialect, inner, names, false),
            })
            .collect::<Vec<_>>()
            .join(&separator)
    };

    if group.is_negated() {
        format!("NOT ({})", body)
    } else if top {
        body
    } else {
        format!("({})", body)
    }
}

fn render_node(dialect: &dyn SqlDialect, node: &PredicateNode, params: &[String]) -> String {
    let column = quote_name(dialect, &node.field.name);
    match node.operator {
        Operator::IsNull | Operator::IsNotNull => {
            format!("{} {}", column, node.operator.sql_symbol())
        }
        Operator::In | Operator::NotIn if params.is_empty() => match node.operator {
            Operator::In => "(1 = 0)".to_string(),
            _ => "(1 = 1)".to_string(),
        },
        Operator::In | Operator::NotIn => {
            let list = params
                .iter()
                .map(|p| dialect.parameter(p))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} {} ({})", column, node.operator.sql_symbol(), list)
        }
        _ => {
            let param = params.first().map(|p| dialect.parameter(p)).unwrap_or_default();
            if node.case_sensitive {
                format!("{} {} {}", column, node.operator.sql_symbol(), param)
            } else {
                format!(
                    "LOWER({}) {} LOWER({})",
                    column,
                    node.operator.sql_symbol(),
                    param
                )
            }
        }
    }
}

/// `[Id] = @Id AND [Code] = @Code` over key columns.
pub fn render_keys(dialect: &dyn SqlDialect, keys: &[&DbField], row: Option<usize>) -> String {
    keys.iter()
        .map(|key| {
            format!(
                "{} = {}",
                dialect.quote_identifier(key.name()),
                dialect.parameter(&super::fields::parameter_name(key, row))
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Field;
    use crate::transpiler::{MySqlGenerator, SqlServerGenerator};
    use crate::value::Value;

    fn node(name: &str, op: Operator, value: impl Into<Value>) -> PredicateNode {
        PredicateNode::new(Field::new(name), op, value)
    }

    #[test]
    fn test_top_level_not_parenthesized() {
        let group = PredicateGroup::and([
            node("Name", Operator::Equal, "Jo"),
            node("Age", Operator::GreaterOrEqual, 18i64),
        ]);
        assert_eq!(
            render_group(&SqlServerGenerator, &group, &[]),
            "[Name] = @Name AND [Age] >= @Age"
        );
    }

    #[test]
    fn test_nested_and_negated_groups() {
        let inner = PredicateGroup::or([
            node("Age", Operator::LessThan, 18i64),
            node("Age", Operator::GreaterThan, 65i64),
        ]);
        let group = PredicateGroup::and(vec![
            Predicate::Node(node("Name", Operator::NotEqual, "x")),
            Predicate::Group(inner.clone()),
            Predicate::Group(inner.negate()),
        ]);
        assert_eq!(
            render_group(&MySqlGenerator, &group, &[]),
            "`Name` <> @Name AND (`Age` < @Age OR `Age` > @Age_1) \
             AND NOT (`Age` < @Age_2 OR `Age` > @Age_3)"
        );
    }

    #[test]
    fn test_in_list_and_empty_list() {
        let group = PredicateGroup::and([
            node("Id", Operator::In, Value::list([1i64, 2, 3])),
            node("Code", Operator::In, Value::List(vec![])),
            node("Tag", Operator::NotIn, Value::List(vec![])),
        ]);
        assert_eq!(
            render_group(&SqlServerGenerator, &group, &[]),
            "[Id] IN (@Id_In_0, @Id_In_1, @Id_In_2) AND (1 = 0) AND (1 = 1)"
        );
    }

    #[test]
    fn test_null_checks_take_no_parameter() {
        let group = PredicateGroup::and([
            PredicateNode::is_null(Field::new("Age")),
            node("Age", Operator::Equal, 3i64),
        ]);
        assert_eq!(
            render_group(&SqlServerGenerator, &group, &[]),
            "[Age] IS NULL AND [Age] = @Age"
        );
    }

    #[test]
    fn test_case_insensitive_uses_lower() {
        let group = PredicateGroup::single(node("Name", Operator::Like, "jo%").ignore_case());
        assert_eq!(
            render_where(&SqlServerGenerator, Some(&group), &[]),
            " WHERE LOWER([Name]) LIKE LOWER(@Name)"
        );
    }

    #[test]
    fn test_reserved_names_are_skipped() {
        let group = PredicateGroup::single(node("Name", Operator::Equal, "Jo"));
        assert_eq!(
            render_where(&SqlServerGenerator, Some(&group), &["name".to_string()]),
            " WHERE [Name] = @Name_1"
        );
    }

    #[test]
    fn test_empty_group_renders_nothing() {
        assert_eq!(render_where(&SqlServerGenerator, Some(&PredicateGroup::empty()), &[]), "");
        assert_eq!(render_where(&SqlServerGenerator, None, &[]), "");
    }
}
