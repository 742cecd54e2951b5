//! Pipeline documents.
//!
//! - [`PipelineSpec`] / [`PipelineNode`] - the JSON document as authored
//! - [`operation`] - the closed operation vocabulary and required-config table
//! - [`plan`] - nodes compiled into typed, runnable steps
//!
//! Decoding is lenient about absent node fields (they read as empty) so the
//! validator can report them; a value of the wrong kind is a structural
//! [`SpecError`].

pub mod operation;
pub mod plan;

pub use operation::{
    unmet_requirements, ConfigRequirement, FieldShape, OpKind, INPUT_MARKER, OUTPUT_MARKER,
};
pub use plan::{ExecutionPlan, PlannedStep, SkipReason, StepAction};

use crate::error::SpecResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

/// An ordered list of nodes. List order is execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// A missing `nodes` key reads as an empty pipeline.
    #[serde(default)]
    pub nodes: Vec<PipelineNode>,
}

/// One pipeline step as written by the author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub op: String,
    /// Operation-specific settings. Usually an object; anything else carries no fields.
    #[serde(default)]
    pub config: Value,
    /// Ids of upstream nodes. Only checked for existence and order.
    #[serde(default)]
    pub inputs: Vec<String>,
}

impl PipelineSpec {
    pub fn new(nodes: Vec<PipelineNode>) -> Self {
        Self { nodes }
    }

    pub fn from_json(text: &str) -> SpecResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> SpecResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_file(path: &Path) -> SpecResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> SpecResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Find the last node carrying `id`.
    pub fn node(&self, id: &str) -> Option<&PipelineNode> {
        self.nodes.iter().rev().find(|n| n.id == id)
    }
}

impl PipelineNode {
    pub fn new(id: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            op: op.into(),
            config: Value::Object(Default::default()),
            inputs: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// The operation this node names, if it is part of the vocabulary.
    pub fn kind(&self) -> Option<OpKind> {
        OpKind::from_name(&self.op)
    }
}

/// A small working pipeline touching most operations.
pub fn example_spec() -> PipelineSpec {
    PipelineSpec::new(vec![
        PipelineNode::new("input", "parse_csv"),
        PipelineNode::new("adults", "filter")
            .with_config(json!({"condition": "age >= 18"}))
            .with_inputs(["input"]),
        PipelineNode::new("normalize_email", "transform")
            .with_config(json!({"column": "email", "expression": "lower(value)"}))
            .with_inputs(["adults"]),
        PipelineNode::new("check_email", "validate_email")
            .with_config(json!({"column": "email", "strict": true}))
            .with_inputs(["normalize_email"]),
        PipelineNode::new("signup_dates", "fix_dates")
            .with_config(json!({"column": "signup", "format": "YYYY-MM-DD"}))
            .with_inputs(["check_email"]),
        PipelineNode::new("unique", "dedupe")
            .with_config(json!({"key_columns": ["email"]}))
            .with_inputs(["signup_dates"]),
        PipelineNode::new("output", "output_csv").with_inputs(["unique"]),
    ])
}
