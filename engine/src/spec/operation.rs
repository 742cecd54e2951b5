//! The closed operation vocabulary and its required-config table.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Every operation a node may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    ParseCsv,
    Filter,
    SelectColumns,
    Dedupe,
    RenameColumns,
    Transform,
    ValidateEmail,
    FixDates,
    OutputCsv,
}

/// Operation every pipeline must start with.
pub const INPUT_MARKER: OpKind = OpKind::ParseCsv;

/// Operation every pipeline must end with.
pub const OUTPUT_MARKER: OpKind = OpKind::OutputCsv;

impl OpKind {
    pub const ALL: [OpKind; 9] = [
        OpKind::ParseCsv,
        OpKind::Filter,
        OpKind::SelectColumns,
        OpKind::Dedupe,
        OpKind::RenameColumns,
        OpKind::Transform,
        OpKind::ValidateEmail,
        OpKind::FixDates,
        OpKind::OutputCsv,
    ];

    /// Wire name used in pipeline documents.
    pub fn name(self) -> &'static str {
        match self {
            OpKind::ParseCsv => "parse_csv",
            OpKind::Filter => "filter",
            OpKind::SelectColumns => "select_columns",
            OpKind::Dedupe => "dedupe",
            OpKind::RenameColumns => "rename_columns",
            OpKind::Transform => "transform",
            OpKind::ValidateEmail => "validate_email",
            OpKind::FixDates => "fix_dates",
            OpKind::OutputCsv => "output_csv",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Boundary markers do nothing at execution time.
    pub fn is_marker(self) -> bool {
        matches!(self, OpKind::ParseCsv | OpKind::OutputCsv)
    }

    /// Config fields this operation cannot run without.
    pub fn requirements(self) -> &'static [ConfigRequirement] {
        match self {
            OpKind::SelectColumns => SELECT_COLUMNS,
            OpKind::Dedupe => DEDUPE,
            OpKind::Filter => FILTER,
            OpKind::RenameColumns => RENAME_COLUMNS,
            OpKind::Transform => TRANSFORM,
            OpKind::ValidateEmail | OpKind::FixDates => COLUMN_ONLY,
            OpKind::ParseCsv | OpKind::OutputCsv => &[],
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Required-config table
// =============================================================================

/// Value kind a config field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Array of strings.
    StringList,
    /// A string.
    String,
    /// Object whose values are all strings.
    StringMap,
}

impl FieldShape {
    /// Noun used in validation messages.
    pub fn label(self) -> &'static str {
        match self {
            FieldShape::StringList => "array",
            FieldShape::String => "string",
            FieldShape::StringMap => "object",
        }
    }

    /// Whether `value` (absent when `None`) has this shape.
    pub fn matches(self, value: Option<&Value>) -> bool {
        match (self, value) {
            (FieldShape::StringList, Some(Value::Array(items))) => {
                items.iter().all(Value::is_string)
            }
            (FieldShape::String, Some(Value::String(_))) => true,
            (FieldShape::StringMap, Some(Value::Object(map))) => map.values().all(Value::is_string),
            _ => false,
        }
    }
}

/// One required field of an operation's config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRequirement {
    pub field: &'static str,
    pub shape: FieldShape,
}

const SELECT_COLUMNS: &[ConfigRequirement] = &[ConfigRequirement {
    field: "columns",
    shape: FieldShape::StringList,
}];

const DEDUPE: &[ConfigRequirement] = &[ConfigRequirement {
    field: "key_columns",
    shape: FieldShape::StringList,
}];

const FILTER: &[ConfigRequirement] = &[ConfigRequirement {
    field: "condition",
    shape: FieldShape::String,
}];

const RENAME_COLUMNS: &[ConfigRequirement] = &[ConfigRequirement {
    field: "mapping",
    shape: FieldShape::StringMap,
}];

const TRANSFORM: &[ConfigRequirement] = &[
    ConfigRequirement {
        field: "column",
        shape: FieldShape::String,
    },
    ConfigRequirement {
        field: "expression",
        shape: FieldShape::String,
    },
];

const COLUMN_ONLY: &[ConfigRequirement] = &[ConfigRequirement {
    field: "column",
    shape: FieldShape::String,
}];

/// Requirements of `kind` that `config` does not satisfy, in table order.
pub fn unmet_requirements(kind: OpKind, config: &Value) -> Vec<ConfigRequirement> {
    kind.requirements()
        .iter()
        .filter(|req| !req.shape.matches(config.get(req.field)))
        .copied()
        .collect()
}
