//! Dataset operations.
//!
//! Each pipeline node compiles to one [`Operation`]. Operations mutate a
//! [`Dataset`] in place and never fail: input they cannot interpret is left
//! as it was.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::condition::Condition;
use super::expression::Expression;
use crate::models::{Dataset, Record};
use crate::spec::OpKind;

/// Header appended by `validate_email`.
pub const EMAIL_VALID_COLUMN: &str = "email_valid";

static STRICT_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

static LOOSE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// Input layouts tried in order by `fix_dates`.
const DATE_INPUT_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Output layout for `fix_dates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    #[default]
    Iso,
    /// `MM/DD/YYYY`
    MonthFirst,
    /// `DD/MM/YYYY`
    DayFirst,
}

impl DateFormat {
    /// Unknown labels fall back to ISO.
    pub fn from_label(label: &str) -> Self {
        match label {
            "MM/DD/YYYY" => DateFormat::MonthFirst,
            "DD/MM/YYYY" => DateFormat::DayFirst,
            _ => DateFormat::Iso,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateFormat::Iso => "YYYY-MM-DD",
            DateFormat::MonthFirst => "MM/DD/YYYY",
            DateFormat::DayFirst => "DD/MM/YYYY",
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            DateFormat::Iso => "%Y-%m-%d",
            DateFormat::MonthFirst => "%m/%d/%Y",
            DateFormat::DayFirst => "%d/%m/%Y",
        }
    }

    pub fn format(self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }
}

/// Read a date in any of the accepted input layouts.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(value, layout).ok())
}

pub fn is_valid_email(value: &str, strict: bool) -> bool {
    if strict {
        STRICT_EMAIL.is_match(value)
    } else {
        LOOSE_EMAIL.is_match(value)
    }
}

// =============================================================================
// Operation
// =============================================================================

/// A node's operation with its config decoded.
///
/// `Filter` and `Transform` keep the source text next to the parsed form;
/// an unparseable text makes the node a no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ParseCsv,
    OutputCsv,
    Filter {
        condition: String,
        parsed: Option<Condition>,
    },
    SelectColumns {
        columns: Vec<String>,
    },
    Dedupe {
        key_columns: Vec<String>,
    },
    RenameColumns {
        mapping: HashMap<String, String>,
    },
    Transform {
        column: String,
        expression: String,
        parsed: Option<Expression>,
    },
    ValidateEmail {
        column: String,
        strict: bool,
    },
    FixDates {
        column: String,
        format: DateFormat,
    },
}

impl Operation {
    /// Decode `config` for `kind`.
    ///
    /// Callers check required fields first; a field of the wrong shape reads
    /// as empty here.
    pub fn decode(kind: OpKind, config: &Value) -> Self {
        match kind {
            OpKind::ParseCsv => Operation::ParseCsv,
            OpKind::OutputCsv => Operation::OutputCsv,
            OpKind::Filter => {
                let condition = string_field(config, "condition");
                let parsed = Condition::parse(&condition);
                Operation::Filter { condition, parsed }
            }
            OpKind::SelectColumns => Operation::SelectColumns {
                columns: string_list(config, "columns"),
            },
            OpKind::Dedupe => Operation::Dedupe {
                key_columns: string_list(config, "key_columns"),
            },
            OpKind::RenameColumns => Operation::RenameColumns {
                mapping: string_map(config, "mapping"),
            },
            OpKind::Transform => {
                let expression = string_field(config, "expression");
                let parsed = Expression::parse(&expression);
                Operation::Transform {
                    column: string_field(config, "column"),
                    expression,
                    parsed,
                }
            }
            OpKind::ValidateEmail => Operation::ValidateEmail {
                column: string_field(config, "column"),
                strict: config
                    .get("strict")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            OpKind::FixDates => Operation::FixDates {
                column: string_field(config, "column"),
                format: config
                    .get("format")
                    .and_then(Value::as_str)
                    .map(DateFormat::from_label)
                    .unwrap_or_default(),
            },
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operation::ParseCsv => OpKind::ParseCsv,
            Operation::OutputCsv => OpKind::OutputCsv,
            Operation::Filter { .. } => OpKind::Filter,
            Operation::SelectColumns { .. } => OpKind::SelectColumns,
            Operation::Dedupe { .. } => OpKind::Dedupe,
            Operation::RenameColumns { .. } => OpKind::RenameColumns,
            Operation::Transform { .. } => OpKind::Transform,
            Operation::ValidateEmail { .. } => OpKind::ValidateEmail,
            Operation::FixDates { .. } => OpKind::FixDates,
        }
    }

    /// True when the operation cannot change the data.
    pub fn is_noop(&self) -> bool {
        match self {
            Operation::ParseCsv | Operation::OutputCsv => true,
            Operation::Filter { parsed, .. } => parsed.is_none(),
            Operation::Transform { parsed, .. } => parsed.is_none(),
            _ => false,
        }
    }

    /// Apply this operation to `data` in place.
    pub fn apply(&self, data: &mut Dataset) {
        match self {
            Operation::ParseCsv | Operation::OutputCsv => {}
            Operation::Filter { parsed, .. } => {
                if let Some(condition) = parsed {
                    data.records.retain(|record| condition.matches(record));
                }
            }
            Operation::SelectColumns { columns } => self.apply_select(data, columns),
            Operation::Dedupe { key_columns } => self.apply_dedupe(data, key_columns),
            Operation::RenameColumns { mapping } => self.apply_rename(data, mapping),
            Operation::Transform { column, parsed, .. } => {
                if let Some(expression) = parsed {
                    for record in &mut data.records {
                        if let Some(value) = record.get_mut(column) {
                            *value = expression.apply(value);
                        }
                    }
                }
            }
            Operation::ValidateEmail { column, strict } => {
                self.apply_validate_email(data, column, *strict)
            }
            Operation::FixDates { column, format } => self.apply_fix_dates(data, column, *format),
        }
    }

    fn apply_select(&self, data: &mut Dataset, columns: &[String]) {
        data.headers = columns.to_vec();
        for record in &mut data.records {
            let mut kept = Record::with_capacity(columns.len());
            for column in columns {
                let value = record.remove(column).unwrap_or_default();
                kept.entry(column.clone()).or_insert(value);
            }
            *record = kept;
        }
    }

    fn apply_dedupe(&self, data: &mut Dataset, key_columns: &[String]) {
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        data.records.retain(|record| {
            let key = key_columns
                .iter()
                .map(|column| record.get(column).cloned().unwrap_or_default())
                .collect();
            seen.insert(key)
        });
    }

    fn apply_rename(&self, data: &mut Dataset, mapping: &HashMap<String, String>) {
        let rename = |name: &String| mapping.get(name).unwrap_or(name).clone();
        let old_headers = std::mem::take(&mut data.headers);
        data.headers = old_headers.iter().map(rename).collect();

        for record in &mut data.records {
            // Keys outside the header list go first, then headers in order;
            // when two keys land on one name the later one wins.
            let mut order: Vec<String> = record
                .keys()
                .filter(|key| !old_headers.contains(*key))
                .cloned()
                .collect();
            order.sort();
            order.extend(old_headers.iter().cloned());

            let old = std::mem::take(record);
            for key in &order {
                if let Some(value) = old.get(key) {
                    record.insert(rename(key), value.clone());
                }
            }
        }
    }

    fn apply_validate_email(&self, data: &mut Dataset, column: &str, strict: bool) {
        data.ensure_header(EMAIL_VALID_COLUMN);
        for record in &mut data.records {
            let valid = record
                .get(column)
                .is_some_and(|value| is_valid_email(value, strict));
            record.insert(EMAIL_VALID_COLUMN.to_string(), valid.to_string());
        }
    }

    fn apply_fix_dates(&self, data: &mut Dataset, column: &str, format: DateFormat) {
        for record in &mut data.records {
            if let Some(value) = record.get_mut(column) {
                if let Some(date) = parse_date(value) {
                    *value = format.format(date);
                }
            }
        }
    }
}

fn string_field(config: &Value, field: &str) -> String {
    config
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_list(config: &Value, field: &str) -> Vec<String> {
    config
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn string_map(config: &Value, field: &str) -> HashMap<String, String> {
    config
        .get(field)
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Human-readable reference of every operation and its config.
pub fn operations_description() -> String {
    r#"Available pipeline operations:

| Operation | Description | Config |
|-----------|-------------|--------|
| parse_csv | Input marker, must be the first node | - |
| filter | Keep records matching a condition | condition: "<column> <op> <value>", op one of == != > < >= <= contains |
| select_columns | Keep only the listed columns, in order | columns: [string] |
| dedupe | Drop records whose key repeats an earlier one | key_columns: [string] |
| rename_columns | Rename headers | mapping: {old: new} |
| transform | Rewrite one column | column: string, expression: lower(value) / upper(value) / trim(value) / replace(value, 'OLD', 'NEW') |
| validate_email | Append email_valid true/false | column: string, strict: bool (default false) |
| fix_dates | Normalize dates | column: string, format: YYYY-MM-DD (default) / MM/DD/YYYY / DD/MM/YYYY |
| output_csv | Output marker, must be the last node | - |

Accepted date inputs: 2024-01-15, 01/15/2024, 15/01/2024, 2024/01/15, Jan 15, 2024, January 15, 2024.

Example node:
{"id": "adults", "op": "filter", "config": {"condition": "age >= 18"}, "inputs": ["input"]}"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Table;
    use serde_json::json;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        let table = Table::new(
            strings(headers),
            rows.iter().map(|row| strings(row)).collect(),
        );
        Dataset::from_table(&table)
    }

    fn rows(data: &Dataset) -> Vec<Vec<String>> {
        data.to_table().rows
    }

    #[test]
    fn test_decode_optional_fields() {
        let op = Operation::decode(OpKind::ValidateEmail, &json!({"column": "email"}));
        assert_eq!(
            op,
            Operation::ValidateEmail {
                column: "email".into(),
                strict: false
            }
        );

        let op = Operation::decode(
            OpKind::FixDates,
            &json!({"column": "d", "format": "dd-mm-yy"}),
        );
        assert_eq!(
            op,
            Operation::FixDates {
                column: "d".into(),
                format: DateFormat::Iso
            }
        );
    }

    #[test]
    fn test_decode_keeps_unparseable_text() {
        let op = Operation::decode(OpKind::Filter, &json!({"condition": "age is old"}));
        assert!(op.is_noop());
        assert_eq!(op.kind(), OpKind::Filter);
    }

    #[test]
    fn test_filter() {
        let mut data = dataset(&["name", "age"], &[&["Alice", "25"], &["Bob", "40"]]);
        Operation::decode(OpKind::Filter, &json!({"condition": "age > 30"})).apply(&mut data);
        assert_eq!(rows(&data), vec![strings(&["Bob", "40"])]);
    }

    #[test]
    fn test_filter_unparseable_is_noop() {
        let mut data = dataset(&["name", "age"], &[&["Alice", "25"], &["Bob", "40"]]);
        let before = data.clone();
        Operation::decode(OpKind::Filter, &json!({"condition": "age"})).apply(&mut data);
        assert_eq!(data, before);
    }

    #[test]
    fn test_filter_idempotent() {
        let mut data = dataset(
            &["city"],
            &[&["Paris"], &["Lyon"], &["paris"], &["Parisian"]],
        );
        let op = Operation::decode(OpKind::Filter, &json!({"condition": "city contains paris"}));
        op.apply(&mut data);
        let once = data.clone();
        op.apply(&mut data);
        assert_eq!(data, once);
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn test_select_columns_reorders_and_fills() {
        let mut data = dataset(&["a", "b", "c"], &[&["1", "2", "3"], &["4"]]);
        Operation::SelectColumns {
            columns: strings(&["c", "a", "z"]),
        }
        .apply(&mut data);

        assert_eq!(data.headers, strings(&["c", "a", "z"]));
        assert_eq!(rows(&data), vec![strings(&["3", "1", ""]), strings(&["", "4", ""])]);
        assert!(!data.records[0].contains_key("b"));
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut data = dataset(
            &["email", "n"],
            &[&["a@x.com", "1"], &["b@x.com", "2"], &["a@x.com", "3"]],
        );
        Operation::Dedupe {
            key_columns: strings(&["email"]),
        }
        .apply(&mut data);
        assert_eq!(
            rows(&data),
            vec![strings(&["a@x.com", "1"]), strings(&["b@x.com", "2"])]
        );
    }

    #[test]
    fn test_dedupe_missing_column_reads_empty() {
        let mut data = dataset(&["a", "b"], &[&["1"], &["1", ""], &["1", "x"]]);
        Operation::Dedupe {
            key_columns: strings(&["a", "b"]),
        }
        .apply(&mut data);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_dedupe_key_is_a_tuple() {
        let mut data = dataset(&["a", "b"], &[&["x|y", "z"], &["x", "y|z"]]);
        Operation::Dedupe {
            key_columns: strings(&["a", "b"]),
        }
        .apply(&mut data);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_dedupe_empty_key_keeps_one() {
        let mut data = dataset(&["a"], &[&["1"], &["2"]]);
        Operation::Dedupe {
            key_columns: Vec::new(),
        }
        .apply(&mut data);
        assert_eq!(rows(&data), vec![strings(&["1"])]);
    }

    #[test]
    fn test_rename_columns() {
        let mut data = dataset(&["first", "age"], &[&["Alice", "25"]]);
        Operation::decode(
            OpKind::RenameColumns,
            &json!({"mapping": {"first": "name", "ghost": "x"}}),
        )
        .apply(&mut data);

        assert_eq!(data.headers, strings(&["name", "age"]));
        assert_eq!(data.records[0]["name"], "Alice");
        assert!(!data.records[0].contains_key("first"));
    }

    #[test]
    fn test_rename_collision_later_header_wins() {
        let mut data = dataset(&["a", "b"], &[&["1", "2"]]);
        Operation::decode(OpKind::RenameColumns, &json!({"mapping": {"a": "b"}}))
            .apply(&mut data);
        assert_eq!(data.headers, strings(&["b", "b"]));
        assert_eq!(data.records[0]["b"], "2");
    }

    #[test]
    fn test_transform() {
        let mut data = dataset(&["email"], &[&["  ALICE@X.COM "], &[]]);
        Operation::decode(
            OpKind::Transform,
            &json!({"column": "email", "expression": "trim(value)"}),
        )
        .apply(&mut data);
        Operation::decode(
            OpKind::Transform,
            &json!({"column": "email", "expression": "lower(value)"}),
        )
        .apply(&mut data);

        assert_eq!(data.records[0]["email"], "alice@x.com");
        assert!(!data.records[1].contains_key("email"));
    }

    #[test]
    fn test_transform_unknown_expression_is_noop() {
        let mut data = dataset(&["n"], &[&["Abc"]]);
        let before = data.clone();
        Operation::decode(
            OpKind::Transform,
            &json!({"column": "n", "expression": "reverse(value)"}),
        )
        .apply(&mut data);
        assert_eq!(data, before);
    }

    #[test]
    fn test_validate_email_strict_and_loose() {
        let mut strict = dataset(&["email"], &[&["a@b.co"], &["a@b.c"], &["nope"]]);
        Operation::ValidateEmail {
            column: "email".into(),
            strict: true,
        }
        .apply(&mut strict);
        assert_eq!(strict.headers, strings(&["email", "email_valid"]));
        let flags: Vec<_> = strict.records.iter().map(|r| r["email_valid"].clone()).collect();
        assert_eq!(flags, strings(&["true", "false", "false"]));

        let mut loose = dataset(&["email"], &[&["a@b.c"], &["a b@c.d"]]);
        Operation::ValidateEmail {
            column: "email".into(),
            strict: false,
        }
        .apply(&mut loose);
        let flags: Vec<_> = loose.records.iter().map(|r| r["email_valid"].clone()).collect();
        assert_eq!(flags, strings(&["true", "false"]));
    }

    #[test]
    fn test_validate_email_header_appended_once() {
        let mut data = dataset(&["email"], &[&["a@b.co"]]);
        let op = Operation::ValidateEmail {
            column: "email".into(),
            strict: false,
        };
        op.apply(&mut data);
        op.apply(&mut data);
        assert_eq!(data.headers, strings(&["email", "email_valid"]));
    }

    #[test]
    fn test_validate_email_missing_column_is_false() {
        let mut data = dataset(&["name"], &[&["Alice"]]);
        Operation::ValidateEmail {
            column: "email".into(),
            strict: false,
        }
        .apply(&mut data);
        assert_eq!(data.records[0]["email_valid"], "false");
    }

    #[test]
    fn test_parse_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        for input in [
            "2024-01-15",
            "01/15/2024",
            "15/01/2024",
            "2024/01/15",
            "Jan 15, 2024",
            "January 15, 2024",
        ] {
            assert_eq!(parse_date(input), expected, "{input}");
        }
        assert_eq!(parse_date("15.01.2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_date_month_first_when_ambiguous() {
        assert_eq!(parse_date("03/04/2024"), NaiveDate::from_ymd_opt(2024, 3, 4));
    }

    #[test]
    fn test_fix_dates() {
        let mut data = dataset(&["d"], &[&["01/15/2024"], &["not a date"], &["2024-02-29"]]);
        Operation::decode(OpKind::FixDates, &json!({"column": "d"})).apply(&mut data);
        let values: Vec<_> = data.records.iter().map(|r| r["d"].clone()).collect();
        assert_eq!(values, strings(&["2024-01-15", "not a date", "2024-02-29"]));

        Operation::decode(
            OpKind::FixDates,
            &json!({"column": "d", "format": "DD/MM/YYYY"}),
        )
        .apply(&mut data);
        assert_eq!(data.records[0]["d"], "15/01/2024");
    }

    #[test]
    fn test_date_format_labels() {
        for format in [DateFormat::Iso, DateFormat::MonthFirst, DateFormat::DayFirst] {
            assert_eq!(DateFormat::from_label(format.label()), format);
        }
    }

    #[test]
    fn test_operations_description_lists_everything() {
        let text = operations_description();
        for kind in OpKind::ALL {
            assert!(text.contains(kind.name()), "{kind}");
        }
    }
}
