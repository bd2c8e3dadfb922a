//! Parameter naming for predicate values.
//!
//! The statement builders and the parameter binder both walk a group through
//! [`PredicateGroup::parameter_names`], so the names in the SQL text and the
//! names of the bound values always agree.

use std::collections::HashSet;

use serde::Serialize;

use super::{PredicateGroup, PredicateNode};
use crate::value::{Value, ValueType};

/// A predicate value with its parameter name (without dialect prefix).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParameter {
    pub name: String,
    pub value: Value,
    pub value_type: Option<ValueType>,
}

/// Turn a column name into a parameter name: anything that is not a letter,
/// digit or underscore becomes `_`.
pub fn sanitize_parameter(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    fn new(reserved: &[String]) -> Self {
        Self {
            used: reserved.iter().map(|r| r.to_lowercase()).collect(),
        }
    }

    fn taken(&self, name: &str) -> bool {
        self.used.contains(&name.to_lowercase())
    }

    /// Claim a scalar name (`count == None`) or a list of `count` names.
    fn claim(&mut self, base: &str, count: Option<usize>) -> Vec<String> {
        let make = |stem: &str| match count {
            None => vec![stem.to_string()],
            Some(n) => (0..n).map(|i| format!("{}_In_{}", stem, i)).collect::<Vec<_>>(),
        };

        let mut names = make(base);
        let mut suffix = 0;
        while names.iter().any(|n| self.taken(n)) {
            suffix += 1;
            names = make(&format!("{}_{}", base, suffix));
        }
        for name in &names {
            self.used.insert(name.to_lowercase());
        }
        names
    }

    fn node(&mut self, node: &PredicateNode) -> Vec<String> {
        let base = sanitize_parameter(&node.field.name);
        if node.operator.is_null_check() {
            Vec::new()
        } else if node.operator.is_list() {
            self.claim(&base, Some(node.list_values().len()))
        } else {
            self.claim(&base, None)
        }
    }
}

impl PredicateGroup {
    /// Parameter names of every node, depth-first. `reserved` holds names
    /// already used elsewhere in the statement (compared case-insensitively).
    pub fn parameter_names(&self, reserved: &[String]) -> Vec<Vec<String>> {
        let mut names = NameAllocator::new(reserved);
        self.nodes().into_iter().map(|node| names.node(node)).collect()
    }

    /// Named values to bind for this group.
    pub fn parameters(&self, reserved: &[String]) -> Vec<BoundParameter> {
        let mut out = Vec::new();
        for (node, names) in self.nodes().into_iter().zip(self.parameter_names(reserved)) {
            if node.operator.is_list() {
                for (name, value) in names.into_iter().zip(node.list_values()) {
                    out.push(BoundParameter {
                        name,
                        value,
                        value_type: node.field.value_type,
                    });
                }
            } else if let Some(name) = names.into_iter().next() {
                out.push(BoundParameter {
                    name,
                    value: node.value.clone(),
                    value_type: node.field.value_type,
                });
            }
        }
        out
    }
}
