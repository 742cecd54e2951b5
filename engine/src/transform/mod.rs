//! Pipeline execution.
//!
//! - DSL: filter conditions, transform expressions, typed operations
//! - Executor: runs a compiled plan over CSV text
//! - Metrics: run metrics and output evaluation
//! - Pipeline: validate, execute and report, with logging

pub mod dsl;
pub mod executor;
pub mod metrics;
pub mod pipeline;

pub use dsl::*;
pub use executor::{
    execute, execute_json, execute_plan, execute_with, ExecutionReport, NodeLog, NodeStatus,
};
pub use metrics::{
    compute_metrics, evaluate_run, quality_checks, QualityCheck, RunEval, RunMetrics,
};
pub use pipeline::{run_pipeline, run_pipeline_bytes, run_pipeline_json, RunReport};
