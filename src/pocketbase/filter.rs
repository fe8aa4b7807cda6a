//! Filter expressions for collection list queries.
//!
//! The backend accepts a small boolean language: `field = "x"`, `field != "x"`,
//! `field ~ "x"` (contains), joined with `&&` / `||` and grouped with parentheses.
//! Expressions are built as a tree and rendered on the way out so user input is
//! always quoted and escaped.
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Number(i64),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Number(value as i64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Literal),
    NotEq(String, Literal),
    Contains(String, Literal),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Literal>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn not_eq(field: &str, value: impl Into<Literal>) -> Self {
        Filter::NotEq(field.to_string(), value.into())
    }

    pub fn contains(field: &str, value: impl Into<Literal>) -> Self {
        Filter::Contains(field.to_string(), value.into())
    }

    /// Conjunction that drops empty parts and unwraps a single survivor.
    pub fn and(parts: impl IntoIterator<Item = Filter>) -> Self {
        Self::compound(parts, Filter::And)
    }

    pub fn or(parts: impl IntoIterator<Item = Filter>) -> Self {
        Self::compound(parts, Filter::Or)
    }

    fn compound(parts: impl IntoIterator<Item = Filter>, wrap: fn(Vec<Filter>) -> Filter) -> Self {
        let mut kept: Vec<Filter> = parts.into_iter().filter(|f| !f.is_empty()).collect();
        if kept.len() == 1 {
            return kept.remove(0);
        }
        wrap(kept)
    }

    /// An empty expression matches every record.
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::And(parts) | Filter::Or(parts) => parts.iter().all(Filter::is_empty),
            _ => false,
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Filter::And(_) | Filter::Or(_))
    }

    /// Evaluates the expression against a record locally.
    ///
    /// `~` is a case-insensitive substring test on strings and a membership
    /// test on arrays; a missing field never matches `=` or `~`.
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Filter::Eq(field, lit) => record.get(field).is_some_and(|v| literal_eq(v, lit)),
            Filter::NotEq(field, lit) => !record.get(field).is_some_and(|v| literal_eq(v, lit)),
            Filter::Contains(field, lit) => {
                record.get(field).is_some_and(|v| literal_contains(v, lit))
            }
            Filter::And(parts) => parts.iter().all(|p| p.matches(record)),
            Filter::Or(parts) => parts.is_empty() || parts.iter().any(|p| p.matches(record)),
        }
    }
}

fn literal_eq(value: &Value, lit: &Literal) -> bool {
    match (value, lit) {
        (Value::String(s), Literal::Text(t)) => s == t,
        (Value::Number(n), Literal::Number(m)) => n.as_f64() == Some(*m as f64),
        (Value::Number(n), Literal::Text(t)) => t.parse::<f64>().ok() == n.as_f64(),
        (Value::String(s), Literal::Number(m)) => s.parse::<i64>().ok() == Some(*m),
        (Value::Bool(b), Literal::Text(t)) => t == if *b { "true" } else { "false" },
        _ => false,
    }
}

fn literal_contains(value: &Value, lit: &Literal) -> bool {
    let needle = match lit {
        Literal::Text(t) => t.to_lowercase(),
        Literal::Number(n) => n.to_string(),
    };
    match value {
        Value::String(s) => s.to_lowercase().contains(&needle),
        Value::Array(items) => items.iter().any(|item| match item {
            Value::String(s) => s.to_lowercase().contains(&needle),
            other => literal_eq(other, lit),
        }),
        Value::Number(n) => n.to_string().contains(&needle),
        _ => false,
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, lit: &Literal) -> fmt::Result {
    match lit {
        Literal::Number(n) => write!(f, "{n}"),
        Literal::Text(t) => {
            f.write_str("\"")?;
            for ch in t.chars() {
                match ch {
                    '"' => f.write_str("\\\"")?,
                    '\\' => f.write_str("\\\\")?,
                    c => write!(f, "{c}")?,
                }
            }
            f.write_str("\"")
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Filter], op: &str) -> fmt::Result {
    let mut first = true;
    for part in parts.iter().filter(|p| !p.is_empty()) {
        if !first {
            write!(f, " {op} ")?;
        }
        first = false;
        if part.is_compound() {
            write!(f, "({part})")?;
        } else {
            write!(f, "{part}")?;
        }
    }
    Ok(())
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq(field, lit) => {
                write!(f, "{field} = ")?;
                write_literal(f, lit)
            }
            Filter::NotEq(field, lit) => {
                write!(f, "{field} != ")?;
                write_literal(f, lit)
            }
            Filter::Contains(field, lit) => {
                write!(f, "{field} ~ ")?;
                write_literal(f, lit)
            }
            Filter::And(parts) => write_joined(f, parts, "&&"),
            Filter::Or(parts) => write_joined(f, parts, "||"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_nested_groups_with_parentheses() {
        let filter = Filter::and([
            Filter::or([
                Filter::contains("title", "x"),
                Filter::contains("description", "x"),
            ]),
            Filter::contains("genre", "g1"),
            Filter::eq("year", 2020),
        ]);
        assert_eq!(
            filter.to_string(),
            r#"(title ~ "x" || description ~ "x") && genre ~ "g1" && year = 2020"#
        );
    }

    #[test]
    fn empty_conjunction_renders_nothing() {
        let filter = Filter::and(Vec::new());
        assert!(filter.is_empty());
        assert_eq!(filter.to_string(), "");
        assert!(filter.matches(&json!({"title": "anything"})));
    }

    #[test]
    fn single_part_is_unwrapped() {
        let filter = Filter::and([Filter::and(Vec::new()), Filter::eq("video", "abc")]);
        assert_eq!(filter, Filter::eq("video", "abc"));
        assert_eq!(filter.to_string(), r#"video = "abc""#);
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        let filter = Filter::contains("title", r#"say "hi" \o/"#);
        assert_eq!(filter.to_string(), r#"title ~ "say \"hi\" \\o/""#);
    }

    #[test]
    fn matches_records_locally() {
        let record = json!({
            "id": "v1",
            "title": "The Quantum Leap",
            "genre": ["g1", "g2"],
            "year": 2020,
            "type": "movie"
        });
        assert!(Filter::contains("title", "quantum").matches(&record));
        assert!(Filter::contains("genre", "g2").matches(&record));
        assert!(Filter::eq("year", 2020).matches(&record));
        assert!(Filter::not_eq("id", "v2").matches(&record));
        assert!(!Filter::eq("type", "serias").matches(&record));
        assert!(!Filter::eq("missing", "x").matches(&record));
    }
}
