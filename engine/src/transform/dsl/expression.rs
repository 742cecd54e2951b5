//! Transform expressions over a single cell value.
//!
//! Recognized forms, matched exactly:
//! - `lower(value)`
//! - `upper(value)`
//! - `trim(value)`
//! - `replace(value, 'OLD', 'NEW')` - literal, every occurrence
//!
//! Anything else parses to `None` and the transform node leaves data alone.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Lower,
    Upper,
    Trim,
    Replace { from: String, to: String },
}

impl Expression {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "lower(value)" => Some(Expression::Lower),
            "upper(value)" => Some(Expression::Upper),
            "trim(value)" => Some(Expression::Trim),
            _ => parse_replace(text),
        }
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Expression::Lower => value.to_lowercase(),
            Expression::Upper => value.to_uppercase(),
            Expression::Trim => value.trim().to_string(),
            // An empty needle would match between every character.
            Expression::Replace { from, .. } if from.is_empty() => value.to_string(),
            Expression::Replace { from, to } => value.replace(from.as_str(), to),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Lower => write!(f, "lower(value)"),
            Expression::Upper => write!(f, "upper(value)"),
            Expression::Trim => write!(f, "trim(value)"),
            Expression::Replace { from, to } => write!(f, "replace(value, '{from}', '{to}')"),
        }
    }
}

fn parse_replace(text: &str) -> Option<Expression> {
    let args = text.strip_prefix("replace(")?.strip_suffix(')')?;
    let rest = args.strip_prefix("value,")?.trim_start();
    let (from, rest) = quoted(rest)?;
    let rest = rest.strip_prefix(',')?.trim_start();
    let (to, rest) = quoted(rest)?;

    rest.is_empty().then(|| Expression::Replace {
        from: from.to_string(),
        to: to.to_string(),
    })
}

/// Split a leading `'...'` literal off `text`.
fn quoted(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_prefix('\'')?;
    let end = inner.find('\'')?;
    Some((&inner[..end], &inner[end + 1..]))
}
