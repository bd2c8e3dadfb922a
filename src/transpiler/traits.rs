//! Dialect syntax primitives.

/// Trait for dialect-specific SQL syntax.
pub trait SqlDialect: Send + Sync {
    /// Display name used in error messages.
    fn name(&self) -> &'static str;

    /// Quote a single identifier part (table or column name).
    fn quote_identifier(&self, name: &str) -> String;

    /// Placeholder text of a named parameter.
    fn parameter(&self, name: &str) -> String {
        format!("@{}", name)
    }

    /// Whether table hints are accepted.
    fn supports_hints(&self) -> bool {
        false
    }

    /// Text appended after the table name when hints are given.
    fn hint_clause(&self, hints: &str) -> String {
        format!(" WITH ({})", hints)
    }

    /// Largest number of parameters one command may carry.
    fn max_parameters(&self) -> usize;
}

/// Quote a possibly schema-qualified name (`dbo.Person`) part by part.
pub fn quote_name(dialect: &dyn SqlDialect, name: &str) -> String {
    name.split('.')
        .map(|part| dialect.quote_identifier(part.trim()))
        .collect::<Vec<_>>()
        .join(".")
}

/// Wrap `name` in `open`/`close`, doubling any embedded closing quote.
pub fn wrap_identifier(name: &str, open: char, close: char) -> String {
    let escaped = name.replace(close, &format!("{}{}", close, close));
    format!("{}{}{}", open, escaped, close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpiler::sql::{mysql::MySqlGenerator, sqlserver::SqlServerGenerator};

    #[test]
    fn test_quote_name_splits_schema() {
        assert_eq!(quote_name(&SqlServerGenerator, "dbo.Person"), "[dbo].[Person]");
        assert_eq!(quote_name(&MySqlGenerator, "Person"), "`Person`");
    }

    #[test]
    fn test_wrap_identifier_escapes() {
        assert_eq!(wrap_identifier("a]b", '[', ']'), "[a]]b]");
        assert_eq!(wrap_identifier("a\"b", '"', '"'), "\"a\"\"b\"");
    }
}
