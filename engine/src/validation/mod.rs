//! Structural validation of pipeline documents.
//!
//! Checks, in order:
//! 1. the pipeline has at least one node (nothing else is checked otherwise)
//! 2. every node has an id, and ids are unique
//! 3. per node: `op` present and known, every input id exists, required
//!    config fields have the right shape
//! 4. the first node is `parse_csv` and the last is `output_csv`
//! 5. no node references itself or a later node
//!
//! All errors are collected; `valid` is derived from the final list.
//!
//! # Example
//!
//! ```rust
//! use pipeline_engine::validation::validate_json;
//!
//! let result = validate_json(r#"{"nodes":[{"id":"in","op":"parse_csv"}]}"#);
//! assert!(!result.valid);
//! assert_eq!(result.errors, vec!["Pipeline must end with output_csv node"]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{SpecError, ValidationError};
use crate::spec::{
    ExecutionPlan, OpKind, PipelineSpec, SkipReason, StepAction, INPUT_MARKER, OUTPUT_MARKER,
};

/// Outcome of validating one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// A document that did not decode at all.
    pub fn structural(err: &SpecError) -> Self {
        Self::from_errors(vec![err.to_string()])
    }
}

/// Validation issues together with the compiled plan they were read from.
#[derive(Debug, Clone)]
pub struct CheckedPipeline {
    pub issues: Vec<ValidationError>,
    pub plan: ExecutionPlan,
}

impl CheckedPipeline {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    pub fn result(&self) -> ValidationResult {
        ValidationResult::from_errors(self.messages())
    }
}

/// Validate `spec` and keep the compiled plan for execution.
pub fn check(spec: &PipelineSpec) -> CheckedPipeline {
    let plan = ExecutionPlan::from_spec(spec);
    let issues = collect_issues(spec, &plan);
    CheckedPipeline { issues, plan }
}

pub fn validate(spec: &PipelineSpec) -> ValidationResult {
    check(spec).result()
}

/// Validate raw JSON. A document that does not decode yields a single
/// `Parse error: ...` message.
pub fn validate_json(spec_json: &str) -> ValidationResult {
    match PipelineSpec::from_json(spec_json) {
        Ok(spec) => validate(&spec),
        Err(err) => ValidationResult::structural(&err),
    }
}

pub fn is_valid(spec: &PipelineSpec) -> bool {
    check(spec).is_valid()
}

fn collect_issues(spec: &PipelineSpec, plan: &ExecutionPlan) -> Vec<ValidationError> {
    let mut issues = Vec::new();

    if spec.nodes.is_empty() {
        issues.push(ValidationError::EmptyPipeline);
        return issues;
    }

    // Pass 1: identity. A repeated id resolves to its last position.
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (index, node) in spec.nodes.iter().enumerate() {
        if node.id.is_empty() {
            issues.push(ValidationError::MissingId);
            continue;
        }
        if positions.insert(node.id.as_str(), index).is_some() {
            issues.push(ValidationError::DuplicateId(node.id.clone()));
        }
    }

    // Pass 2: operation, references, config.
    for (node, step) in spec.nodes.iter().zip(&plan.steps) {
        if node.id.is_empty() {
            continue;
        }
        if node.op.is_empty() {
            issues.push(ValidationError::MissingOp {
                node: node.id.clone(),
            });
            continue;
        }
        if OpKind::from_name(&node.op).is_none() {
            issues.push(ValidationError::UnknownOperation {
                node: node.id.clone(),
                op: node.op.clone(),
            });
        }
        for input in &node.inputs {
            if !positions.contains_key(input.as_str()) {
                issues.push(ValidationError::UnknownInput {
                    node: node.id.clone(),
                    input: input.clone(),
                });
            }
        }
        if let StepAction::Skip(SkipReason::InvalidConfig { kind, missing }) = &step.action {
            for req in missing {
                issues.push(ValidationError::MissingConfig {
                    node: node.id.clone(),
                    op: kind.name(),
                    field: req.field,
                    shape: req.shape.label(),
                });
            }
        }
    }

    // Pass 3: boundary markers.
    if spec.nodes.first().map(|n| n.op.as_str()) != Some(INPUT_MARKER.name()) {
        issues.push(ValidationError::MustStartWith(INPUT_MARKER.name()));
    }
    if spec.nodes.last().map(|n| n.op.as_str()) != Some(OUTPUT_MARKER.name()) {
        issues.push(ValidationError::MustEndWith(OUTPUT_MARKER.name()));
    }

    // Pass 4: inputs must point strictly backwards.
    for (index, node) in spec.nodes.iter().enumerate() {
        if node.id.is_empty() {
            continue;
        }
        for input in &node.inputs {
            if let Some(&target) = positions.get(input.as_str()) {
                if target >= index {
                    issues.push(ValidationError::Cycle {
                        node: node.id.clone(),
                        input: input.clone(),
                    });
                }
            }
        }
    }

    issues
}
