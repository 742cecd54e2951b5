//! Nodes compiled into typed steps.
//!
//! Compilation happens once per pipeline. The validator reads config
//! problems off the plan and the executor runs it, so both agree on what a
//! node's config means.

use super::operation::{unmet_requirements, ConfigRequirement, OpKind};
use super::{PipelineNode, PipelineSpec};
use crate::transform::dsl::Operation;
use std::fmt;

/// One compiled step per node, in list order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub steps: Vec<PlannedStep>,
}

#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub node_id: String,
    pub op: String,
    pub action: StepAction,
}

#[derive(Debug, Clone)]
pub enum StepAction {
    Run(Operation),
    Skip(SkipReason),
}

/// Why a node cannot run. Skipped nodes leave the data unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnknownOperation,
    InvalidConfig {
        kind: OpKind,
        missing: Vec<ConfigRequirement>,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownOperation => write!(f, "unknown operation"),
            SkipReason::InvalidConfig { kind, missing } => {
                let fields: Vec<String> = missing
                    .iter()
                    .map(|req| format!("'{}' {}", req.field, req.shape.label()))
                    .collect();
                write!(f, "{} requires {}", kind, fields.join(", "))
            }
        }
    }
}

impl ExecutionPlan {
    pub fn from_spec(spec: &PipelineSpec) -> Self {
        Self {
            steps: spec.nodes.iter().map(PlannedStep::compile).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Operations that will actually run, in order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.steps.iter().filter_map(|step| match &step.action {
            StepAction::Run(op) => Some(op),
            StepAction::Skip(_) => None,
        })
    }
}

impl PlannedStep {
    pub fn compile(node: &PipelineNode) -> Self {
        let action = match node.kind() {
            None => StepAction::Skip(SkipReason::UnknownOperation),
            Some(kind) => {
                let missing = unmet_requirements(kind, &node.config);
                if missing.is_empty() {
                    StepAction::Run(Operation::decode(kind, &node.config))
                } else {
                    StepAction::Skip(SkipReason::InvalidConfig { kind, missing })
                }
            }
        };

        Self {
            node_id: node.id.clone(),
            op: node.op.clone(),
            action,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.action, StepAction::Skip(_))
    }
}
