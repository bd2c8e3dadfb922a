//! Dialect-neutral predicate AST.
//!
//! Built by the expression compiler (or by hand) and rendered by the
//! statement builders. Values are frozen at construction; the shape of a
//! group (everything except the values) decides which cached plan it uses.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueType};

mod params;

pub use params::{BoundParameter, sanitize_parameter};

/// Column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value_type: Option<ValueType>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: None,
        }
    }

    pub fn typed(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type: Some(value_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// SQL text of the operator.
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Logical complement.
    pub fn negate(self) -> Self {
        match self {
            Operator::Equal => Operator::NotEqual,
            Operator::NotEqual => Operator::Equal,
            Operator::GreaterThan => Operator::LessOrEqual,
            Operator::LessThan => Operator::GreaterOrEqual,
            Operator::GreaterOrEqual => Operator::LessThan,
            Operator::LessOrEqual => Operator::GreaterThan,
            Operator::Like => Operator::NotLike,
            Operator::NotLike => Operator::Like,
            Operator::In => Operator::NotIn,
            Operator::NotIn => Operator::In,
            Operator::IsNull => Operator::IsNotNull,
            Operator::IsNotNull => Operator::IsNull,
        }
    }

    /// Operator to use when the operands swap sides (`5 < x` is `x > 5`).
    pub fn mirror(self) -> Self {
        match self {
            Operator::GreaterThan => Operator::LessThan,
            Operator::LessThan => Operator::GreaterThan,
            Operator::GreaterOrEqual => Operator::LessOrEqual,
            Operator::LessOrEqual => Operator::GreaterOrEqual,
            other => other,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn is_null_check(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

/// A single field/operator/value condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateNode {
    pub field: Field,
    pub operator: Operator,
    pub value: Value,
    pub case_sensitive: bool,
}

impl PredicateNode {
    pub fn new(field: Field, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
            case_sensitive: true,
        }
    }

    pub fn is_null(field: Field) -> Self {
        Self::new(field, Operator::IsNull, Value::Null)
    }

    pub fn is_not_null(field: Field) -> Self {
        Self::new(field, Operator::IsNotNull, Value::Null)
    }

    /// Compare without regard to case.
    pub fn ignore_case(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Same node with the complementary operator.
    pub fn negate(mut self) -> Self {
        self.operator = self.operator.negate();
        self
    }

    /// Elements of an IN / NOT IN list. A scalar counts as a list of one.
    pub fn list_values(&self) -> Vec<Value> {
        match &self.value {
            Value::List(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    fn hash_shape<H: Hasher>(&self, state: &mut H) {
        self.field.name.hash(state);
        self.operator.hash(state);
        self.case_sensitive.hash(state);
        if self.operator.is_list() {
            self.list_values().len().hash(state);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// Item of a predicate group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Node(PredicateNode),
    Group(PredicateGroup),
}

impl From<PredicateNode> for Predicate {
    fn from(node: PredicateNode) -> Self {
        Predicate::Node(node)
    }
}

impl From<PredicateGroup> for Predicate {
    fn from(group: PredicateGroup) -> Self {
        Predicate::Group(group)
    }
}

/// Ordered nodes and subgroups joined by one conjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateGroup {
    items: Vec<Predicate>,
    conjunction: Conjunction,
    negated: bool,
}

impl Default for PredicateGroup {
    fn default() -> Self {
        Self::empty()
    }
}

impl PredicateGroup {
    pub fn new(conjunction: Conjunction, items: Vec<Predicate>) -> Self {
        Self {
            items,
            conjunction,
            negated: false,
        }
    }

    /// A group that filters nothing.
    pub fn empty() -> Self {
        Self::new(Conjunction::And, Vec::new())
    }

    pub fn and(items: impl IntoIterator<Item = impl Into<Predicate>>) -> Self {
        Self::new(Conjunction::And, items.into_iter().map(Into::into).collect())
    }

    pub fn or(items: impl IntoIterator<Item = impl Into<Predicate>>) -> Self {
        Self::new(Conjunction::Or, items.into_iter().map(Into::into).collect())
    }

    /// Single-node group.
    pub fn single(node: PredicateNode) -> Self {
        Self::new(Conjunction::And, vec![Predicate::Node(node)])
    }

    /// Same group wrapped in `NOT (...)`; negating twice cancels out.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn items(&self) -> &[Predicate] {
        &self.items
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All nodes, depth-first in rendering order.
    pub fn nodes(&self) -> Vec<&PredicateNode> {
        let mut out = Vec::new();
        collect_nodes(self, &mut out);
        out
    }

    /// Hash of everything that affects the rendered SQL except the values.
    pub fn shape_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_shape(&mut hasher);
        hasher.finish()
    }

    fn hash_shape<H: Hasher>(&self, state: &mut H) {
        self.conjunction.hash(state);
        self.negated.hash(state);
        self.items.len().hash(state);
        for item in &self.items {
            match item {
                Predicate::Node(node) => {
                    0u8.hash(state);
                    node.hash_shape(state);
                }
                Predicate::Group(group) => {
                    1u8.hash(state);
                    group.hash_shape(state);
                }
            }
        }
    }
}

fn collect_nodes<'a>(group: &'a PredicateGroup, out: &mut Vec<&'a PredicateNode>) {
    for item in &group.items {
        match item {
            Predicate::Node(node) => out.push(node),
            Predicate::Group(inner) => collect_nodes(inner, out),
        }
    }
}
