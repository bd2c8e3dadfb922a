//! Bound commands handed to a driver.

use std::sync::Arc;

use serde::Serialize;

use crate::predicate::BoundParameter;
use crate::value::{Value, ValueType};

/// A named parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbParameter {
    /// Name without the dialect prefix.
    pub name: String,
    pub value: Value,
    pub value_type: Option<ValueType>,
}

impl From<BoundParameter> for DbParameter {
    fn from(p: BoundParameter) -> Self {
        Self {
            name: p.name,
            value: p.value,
            value_type: p.value_type,
        }
    }
}

/// Command text plus its parameters in binding order.
///
/// The text is shared with the execution plan it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DbCommand {
    text: Arc<str>,
    parameters: Vec<DbParameter>,
}

impl DbCommand {
    pub fn new(text: Arc<str>) -> Self {
        Self {
            text,
            parameters: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> &Arc<str> {
        &self.text
    }

    pub fn parameters(&self) -> &[DbParameter] {
        &self.parameters
    }

    /// Set a parameter. An existing parameter of the same name (compared
    /// case-insensitively) is overwritten in place.
    pub fn set(&mut self, name: impl Into<String>, value: Value, value_type: Option<ValueType>) {
        let name = name.into();
        match self
            .parameters
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&name))
        {
            Some(existing) => {
                existing.value = value;
                existing.value_type = value_type;
            }
            None => self.parameters.push(DbParameter {
                name,
                value,
                value_type,
            }),
        }
    }

    /// Set every parameter of `parameters` in order.
    pub fn extend<P: Into<DbParameter>>(&mut self, parameters: impl IntoIterator<Item = P>) {
        for parameter in parameters {
            let parameter = parameter.into();
            self.set(parameter.name, parameter.value, parameter.value_type);
        }
    }

    pub fn get(&self, name: &str) -> Option<&DbParameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Value of a parameter, if set.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Drop every parameter, keeping the text.
    pub fn clear(&mut self) {
        self.parameters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_existing_name() {
        let mut cmd = DbCommand::new(Arc::from("SELECT 1;"));
        cmd.set("Name", Value::from("a"), Some(ValueType::Text));
        cmd.set("name", Value::from("b"), Some(ValueType::Text));
        cmd.set("Age", Value::Int(3), None);

        assert_eq!(cmd.len(), 2);
        assert_eq!(cmd.value("NAME"), Some(&Value::from("b")));
        assert_eq!(cmd.parameters()[1].name, "Age");
    }

    #[test]
    fn test_extend_with_bound_parameters() {
        let mut cmd = DbCommand::new(Arc::from("SELECT 1;"));
        cmd.set("Age", Value::Int(1), None);
        cmd.extend([
            BoundParameter {
                name: "Age".to_string(),
                value: Value::Int(2),
                value_type: Some(ValueType::Int32),
            },
            BoundParameter {
                name: "Age_1".to_string(),
                value: Value::Int(3),
                value_type: Some(ValueType::Int32),
            },
        ]);
        assert_eq!(cmd.len(), 2);
        assert_eq!(cmd.value("Age"), Some(&Value::Int(2)));
        assert_eq!(cmd.get("Age_1").unwrap().value_type, Some(ValueType::Int32));
    }

    #[test]
    fn test_text_is_shared() {
        let text: Arc<str> = Arc::from("DELETE FROM [T];");
        let cmd = DbCommand::new(text.clone());
        assert!(Arc::ptr_eq(cmd.shared_text(), &text));
        assert!(cmd.is_empty());
    }
}
