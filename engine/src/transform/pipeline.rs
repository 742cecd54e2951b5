//! High-level run API: validate, execute, measure, log.
//!
//! # Example
//!
//! ```rust
//! use pipeline_engine::config::RunOptions;
//! use pipeline_engine::spec::example_spec;
//! use pipeline_engine::transform::pipeline::run_pipeline;
//!
//! let csv = "name,age,email,signup\nAnn,34,ANN@X.IO,01/15/2024\nTim,12,tim@x.io,2024-02-01\n";
//! let report = run_pipeline(&example_spec(), csv, &RunOptions::default()).unwrap();
//! assert_eq!(report.metrics.output_rows, 1);
//! assert!(report.output_csv.contains("ann@x.io,2024-01-15,true"));
//! ```

use serde::Serialize;
use std::time::Instant;

use super::executor::{execute_plan, NodeLog, NodeStatus};
use super::metrics::{compute_metrics, evaluate_run, quality_checks, QualityCheck, RunEval, RunMetrics};
use crate::api::logs::{log, log_error, log_info, log_success, log_warning, LogEntry};
use crate::config::RunOptions;
use crate::error::{ExecutionError, ExecutionResult};
use crate::parser::decode_bytes;
use crate::spec::PipelineSpec;
use crate::validation;

/// Result of a complete run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    /// RFC 3339, UTC.
    pub started_at: String,
    pub output_csv: String,
    pub nodes: Vec<NodeLog>,
    pub metrics: RunMetrics,
    pub eval: RunEval,
    pub quality_checks: Vec<QualityCheck>,
    /// Empty unless validation was skipped on an invalid pipeline.
    pub validation_errors: Vec<String>,
}

/// Run `spec` over `input_csv`.
///
/// With `options.validate` an invalid pipeline is refused with
/// [`ExecutionError::InvalidPipeline`]; without it the errors are logged,
/// carried in the report, and execution goes ahead.
pub fn run_pipeline(
    spec: &PipelineSpec,
    input_csv: &str,
    options: &RunOptions,
) -> ExecutionResult<RunReport> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let started_at = chrono::Utc::now().to_rfc3339();

    log(LogEntry::info(format!("▶ Run {} ({} nodes)", run_id, spec.nodes.len())).with_run_id(&run_id));

    let checked = validation::check(spec);
    let validation_errors = checked.messages();

    if validation_errors.is_empty() {
        log_success("Pipeline valid");
    } else if options.validate {
        for message in &validation_errors {
            log_error(message.as_str());
        }
        return Err(ExecutionError::InvalidPipeline(validation_errors));
    } else {
        log_warning(format!(
            "{} validation error(s), running anyway",
            validation_errors.len()
        ));
        for message in &validation_errors {
            log(LogEntry::warning(message.as_str()).with_indent(1));
        }
    }

    let started = Instant::now();
    let report = execute_plan(&checked.plan, input_csv, options)?;
    let exec_time_ms = started.elapsed().as_millis() as u64;

    log_info(format!("Read {} rows", report.input_rows));
    for node in &report.nodes {
        log_node(node);
    }

    let metrics = compute_metrics(report.input_rows, &report.output, exec_time_ms);
    let eval = evaluate_run(
        &checked.plan,
        report.input_rows,
        &report.output,
        &validation_errors,
    );
    let checks = quality_checks(&metrics, &eval);

    for check in checks.iter().filter(|c| !c.passed) {
        log_warning(format!("{}: {}", check.name, check.message));
    }
    log_success(format!(
        "{} → {} rows in {}ms (score {:.1})",
        metrics.input_rows, metrics.output_rows, metrics.exec_time_ms, eval.score
    ));

    Ok(RunReport {
        run_id,
        started_at,
        output_csv: report.csv,
        nodes: report.nodes,
        metrics,
        eval,
        quality_checks: checks,
        validation_errors,
    })
}

/// Decode `spec_json`, then [`run_pipeline`].
pub fn run_pipeline_json(
    spec_json: &str,
    input_csv: &str,
    options: &RunOptions,
) -> ExecutionResult<RunReport> {
    let spec = PipelineSpec::from_json(spec_json)?;
    run_pipeline(&spec, input_csv, options)
}

/// Decode raw input bytes (any supported encoding), then [`run_pipeline`].
pub fn run_pipeline_bytes(
    spec: &PipelineSpec,
    input: &[u8],
    options: &RunOptions,
) -> ExecutionResult<RunReport> {
    let decoded = decode_bytes(input)?;
    log_info(format!("Detected encoding: {}", decoded.encoding));
    run_pipeline(spec, &decoded.text, options)
}

fn log_node(node: &NodeLog) {
    let line = format!(
        "[{}] {}: {} → {} rows, {} columns ({:.2}ms)",
        node.node_id, node.op, node.rows_in, node.rows_out, node.columns_out, node.duration_ms
    );
    match &node.status {
        NodeStatus::Applied | NodeStatus::Marker => log(LogEntry::info(line).with_indent(1)),
        NodeStatus::Skipped { reason } => {
            log(LogEntry::warning(format!("{line} skipped: {reason}")).with_indent(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::PipelineNode;
    use serde_json::json;

    fn filter_spec() -> PipelineSpec {
        PipelineSpec::new(vec![
            PipelineNode::new("in", "parse_csv"),
            PipelineNode::new("f", "filter")
                .with_config(json!({"condition": "age > 30"}))
                .with_inputs(["in"]),
            PipelineNode::new("out", "output_csv").with_inputs(["f"]),
        ])
    }

    #[test]
    fn test_run_pipeline() {
        let report = run_pipeline(
            &filter_spec(),
            "name,age\nAlice,25\nBob,40\n",
            &RunOptions::default(),
        )
        .unwrap();

        assert_eq!(report.output_csv, "name,age\nBob,40\n");
        assert_eq!(report.nodes.len(), 3);
        assert_eq!(report.metrics.input_rows, 2);
        assert_eq!(report.metrics.output_rows, 1);
        assert!(report.validation_errors.is_empty());
        assert!(report.eval.exec_success);
        assert_eq!(report.quality_checks.len(), 5);
        assert!(uuid::Uuid::parse_str(&report.run_id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&report.started_at).is_ok());
    }

    #[test]
    fn test_run_pipeline_refuses_invalid() {
        let spec = PipelineSpec::new(vec![PipelineNode::new("in", "parse_csv")]);
        let err = run_pipeline(&spec, "a\n1\n", &RunOptions::default()).unwrap_err();
        match err {
            ExecutionError::InvalidPipeline(errors) => {
                assert_eq!(errors, vec!["Pipeline must end with output_csv node"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_pipeline_skip_validation() {
        let spec = PipelineSpec::new(vec![PipelineNode::new("t", "transform")
            .with_config(json!({"column": "a", "expression": "upper(value)"}))]);
        let options = RunOptions {
            validate: false,
            ..RunOptions::default()
        };
        let report = run_pipeline(&spec, "a\nx\n", &options).unwrap();
        assert_eq!(report.output_csv, "a\nX\n");
        assert_eq!(report.validation_errors.len(), 2);
        assert!(!report.eval.exec_success);
    }

    #[test]
    fn test_run_pipeline_json_parse_error() {
        let err = run_pipeline_json("[]", "a\n1\n", &RunOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("Parse error: "));
    }

    #[test]
    fn test_run_pipeline_bytes_strips_bom() {
        let spec = PipelineSpec::new(vec![
            PipelineNode::new("in", "parse_csv"),
            PipelineNode::new("out", "output_csv"),
        ]);
        let bytes = b"\xEF\xBB\xBFname\nAnn\n";
        let report = run_pipeline_bytes(&spec, bytes, &RunOptions::default()).unwrap();
        assert_eq!(report.output_csv, "name\nAnn\n");
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = run_pipeline(&filter_spec(), "name,age\nA,50\n", &RunOptions::default()).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("runId").is_some());
        assert!(value.get("outputCsv").is_some());
        assert_eq!(value["metrics"]["outputRows"], 1);
        assert_eq!(value["nodes"][1]["status"], "applied");
    }
}
