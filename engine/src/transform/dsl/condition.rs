//! Filter conditions: `<column> <op> <value>`.
//!
//! The column is a run of word characters (`[A-Za-z0-9_]`), the operator is
//! one of `==`, `!=`, `>=`, `<=`, `>`, `<`, `contains`, and the value is the
//! rest of the text. One pair of matching quotes around the value is removed.

use crate::models::Record;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
    Contains,
}

/// Operators in match order; two-character forms come before their prefixes.
const OPERATORS: [(&str, Comparison); 7] = [
    ("==", Comparison::Eq),
    ("!=", Comparison::Ne),
    (">=", Comparison::Ge),
    ("<=", Comparison::Le),
    (">", Comparison::Gt),
    ("<", Comparison::Lt),
    ("contains", Comparison::Contains),
];

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Ge => ">=",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Contains => "contains",
        }
    }

    fn is_ordered(self) -> bool {
        matches!(
            self,
            Comparison::Ge | Comparison::Le | Comparison::Gt | Comparison::Lt
        )
    }
}

/// A parsed single-comparison predicate over one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub comparison: Comparison,
    pub value: String,
}

impl Condition {
    /// Parse a condition string. Returns `None` when it does not fit the grammar.
    pub fn parse(text: &str) -> Option<Self> {
        let column_len = text
            .find(|c: char| !is_word_char(c))
            .unwrap_or(text.len());
        let (column, rest) = text.split_at(column_len);

        if let Some((comparison, value)) = split_operator(rest.trim_start()) {
            if column.is_empty() {
                return None;
            }
            return Self::build(column, comparison, value);
        }

        // The word run may have swallowed a glued `contains`, as in `namecontainsli`.
        let at = column.rfind("contains").filter(|&at| at > 0)?;
        let value = text[at + "contains".len()..].trim_start();
        Self::build(&column[..at], Comparison::Contains, value)
    }

    fn build(column: &str, comparison: Comparison, value: &str) -> Option<Self> {
        if value.is_empty() {
            return None;
        }
        Some(Self {
            column: column.to_string(),
            comparison,
            value: strip_quotes(value).to_string(),
        })
    }

    /// Whether `record` passes. Records without the column never pass.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(cell) = record.get(&self.column) else {
            return false;
        };

        match self.comparison {
            Comparison::Eq => *cell == self.value,
            Comparison::Ne => *cell != self.value,
            Comparison::Contains => cell.to_lowercase().contains(&self.value.to_lowercase()),
            ordered => match (as_number(cell), as_number(&self.value)) {
                (Some(left), Some(right)) => compare(ordered, left, right),
                _ => false,
            },
        }
    }

    /// Ordered comparisons coerce both sides to numbers.
    pub fn is_numeric(&self) -> bool {
        self.comparison.is_ordered()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.column, self.comparison.symbol(), self.value)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn split_operator(text: &str) -> Option<(Comparison, &str)> {
    OPERATORS.iter().find_map(|(symbol, comparison)| {
        text.strip_prefix(symbol)
            .map(|value| (*comparison, value.trim_start()))
    })
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn as_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

fn compare(comparison: Comparison, left: f64, right: f64) -> bool {
    match comparison {
        Comparison::Gt => left > right,
        Comparison::Lt => left < right,
        Comparison::Ge => left >= right,
        Comparison::Le => left <= right,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_basic() {
        let cond = Condition::parse("age > 30").unwrap();
        assert_eq!(cond.column, "age");
        assert_eq!(cond.comparison, Comparison::Gt);
        assert_eq!(cond.value, "30");
    }

    #[test]
    fn test_parse_two_char_operators_first() {
        assert_eq!(Condition::parse("age >= 30").unwrap().comparison, Comparison::Ge);
        assert_eq!(Condition::parse("age<=30").unwrap().comparison, Comparison::Le);
        assert_eq!(Condition::parse("a != b").unwrap().comparison, Comparison::Ne);
        assert_eq!(Condition::parse("a==b").unwrap().comparison, Comparison::Eq);
    }

    #[test]
    fn test_parse_strips_matching_quotes() {
        assert_eq!(Condition::parse("city == 'Paris'").unwrap().value, "Paris");
        assert_eq!(Condition::parse("city == \"Paris\"").unwrap().value, "Paris");
        assert_eq!(Condition::parse("city == 'Paris\"").unwrap().value, "'Paris\"");
        assert_eq!(Condition::parse("city == '").unwrap().value, "'");
    }

    #[test]
    fn test_parse_contains() {
        let cond = Condition::parse("name contains 'li'").unwrap();
        assert_eq!(cond.comparison, Comparison::Contains);
        assert_eq!(cond.value, "li");

        let glued = Condition::parse("namecontains li").unwrap();
        assert_eq!(glued.column, "name");
        assert_eq!(glued.comparison, Comparison::Contains);
        assert_eq!(glued.value, "li");
        assert_eq!(Condition::parse("namecontainsli").unwrap().value, "li");
        assert!(Condition::parse("contains x").is_none());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Condition::parse("").is_none());
        assert!(Condition::parse("age").is_none());
        assert!(Condition::parse("age >").is_none());
        assert!(Condition::parse("> 30").is_none());
        assert!(Condition::parse("age ~ 30").is_none());
        assert!(Condition::parse("first name == x").is_none());
    }

    #[test]
    fn test_matches_equality_is_exact() {
        let cond = Condition::parse("city == Paris").unwrap();
        assert!(cond.matches(&record(&[("city", "Paris")])));
        assert!(!cond.matches(&record(&[("city", "paris")])));
        assert!(!cond.matches(&record(&[("town", "Paris")])));

        let ne = Condition::parse("city != Paris").unwrap();
        assert!(ne.matches(&record(&[("city", "Lyon")])));
        assert!(!ne.matches(&record(&[("town", "Lyon")])));
    }

    #[test]
    fn test_matches_numeric() {
        let cond = Condition::parse("age > 30").unwrap();
        assert!(cond.is_numeric());
        assert!(cond.matches(&record(&[("age", "40")])));
        assert!(cond.matches(&record(&[("age", " 30.5 ")])));
        assert!(!cond.matches(&record(&[("age", "30")])));
        assert!(!cond.matches(&record(&[("age", "forty")])));
        assert!(!cond.matches(&record(&[("age", "")])));

        let bad_literal = Condition::parse("age > old").unwrap();
        assert!(!bad_literal.matches(&record(&[("age", "99")])));
    }

    #[test]
    fn test_matches_contains_case_insensitive() {
        let cond = Condition::parse("name contains LI").unwrap();
        assert!(cond.matches(&record(&[("name", "Alice")])));
        assert!(!cond.matches(&record(&[("name", "Bob")])));
    }

    #[test]
    fn test_display() {
        let cond = Condition::parse("age>=18").unwrap();
        assert_eq!(cond.to_string(), "age >= '18'");
    }
}
