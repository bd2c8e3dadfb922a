//! Cosmetic pass over generated SQL.
//!
//! Builders assemble aggregate calls as `COUNT (1)`. This pass closes the
//! gap to `COUNT(1)` for the known aggregate keywords only, and never looks
//! inside quoted identifiers or string literals.

const AGGREGATES: [&str; 6] = ["COUNT_BIG", "COUNT", "MIN", "MAX", "SUM", "AVG"];

pub fn tidy(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut word = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(close) = quote {
            out.push(c);
            if c == close {
                if chars.peek() == Some(&close) {
                    // doubled closing quote is an escape
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '[' => quote = Some(']'),
            '"' | '`' | '\'' => quote = Some(c),
            _ => {}
        }

        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            out.push(c);
            continue;
        }

        if c == ' ' && chars.peek() == Some(&'(') && AGGREGATES.contains(&word.as_str()) {
            word.clear();
            continue;
        }

        word.clear();
        out.push(c);
    }

    out
}
