//! Pipeline executor.
//!
//! Parses the input CSV, walks the plan in list order applying each step to
//! the dataset, and serializes the result. `inputs` are not consulted:
//! data flows strictly from one node to the next. Nodes that cannot run are
//! skipped and leave the data unchanged.
//!
//! The executor does no logging. It returns a per-node [`NodeLog`] that the
//! caller may forward.

use serde::Serialize;
use std::time::Instant;

use crate::config::RunOptions;
use crate::error::{ExecutionError, ExecutionResult};
use crate::models::{Dataset, Table};
use crate::parser;
use crate::spec::{ExecutionPlan, PipelineSpec, StepAction};

/// What happened to one node during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeStatus {
    Applied,
    Marker,
    Skipped { reason: String },
}

/// Execution log entry for one node.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLog {
    pub node_id: String,
    pub op: String,
    #[serde(flatten)]
    pub status: NodeStatus,
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_out: usize,
    pub duration_ms: f64,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub input_rows: usize,
    pub output: Table,
    pub csv: String,
    pub nodes: Vec<NodeLog>,
}

impl ExecutionReport {
    pub fn output_rows(&self) -> usize {
        self.output.rows.len()
    }

    /// Nodes that did not run.
    pub fn skipped(&self) -> impl Iterator<Item = &NodeLog> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.status, NodeStatus::Skipped { .. }))
    }
}

/// Run `spec` over `input_csv` with default options and return the output CSV.
///
/// # Example
///
/// ```rust
/// use pipeline_engine::spec::PipelineSpec;
/// use pipeline_engine::transform::executor::execute;
///
/// let spec = PipelineSpec::from_json(r#"{"nodes":[
///     {"id":"in","op":"parse_csv"},
///     {"id":"f","op":"filter","config":{"condition":"age > 30"},"inputs":["in"]},
///     {"id":"out","op":"output_csv","inputs":["f"]}
/// ]}"#).unwrap();
///
/// let csv = execute(&spec, "name,age\nAlice,25\nBob,40\n").unwrap();
/// assert_eq!(csv, "name,age\nBob,40\n");
/// ```
pub fn execute(spec: &PipelineSpec, input_csv: &str) -> ExecutionResult<String> {
    execute_with(spec, input_csv, &RunOptions::default()).map(|report| report.csv)
}

/// Decode `spec_json` and run it with default options.
pub fn execute_json(spec_json: &str, input_csv: &str) -> ExecutionResult<String> {
    let spec = PipelineSpec::from_json(spec_json)?;
    execute(&spec, input_csv)
}

/// Compile `spec` and run it. `options.validate` is not consulted here.
pub fn execute_with(
    spec: &PipelineSpec,
    input_csv: &str,
    options: &RunOptions,
) -> ExecutionResult<ExecutionReport> {
    execute_plan(&ExecutionPlan::from_spec(spec), input_csv, options)
}

/// Run an already compiled plan.
pub fn execute_plan(
    plan: &ExecutionPlan,
    input_csv: &str,
    options: &RunOptions,
) -> ExecutionResult<ExecutionReport> {
    if let Some(max) = options.max_input_bytes {
        if input_csv.len() > max {
            return Err(ExecutionError::InputTooLarge {
                size: input_csv.len(),
                max,
            });
        }
    }

    let table = parser::parse(input_csv, options.delimiter);
    let input_rows = table.rows.len();
    let mut data = Dataset::from_table(&table);
    let mut nodes = Vec::with_capacity(plan.len());

    for step in &plan.steps {
        let rows_in = data.len();
        let started = Instant::now();

        let status = match &step.action {
            StepAction::Run(op) if op.kind().is_marker() => NodeStatus::Marker,
            StepAction::Run(op) => {
                op.apply(&mut data);
                NodeStatus::Applied
            }
            StepAction::Skip(reason) => NodeStatus::Skipped {
                reason: reason.to_string(),
            },
        };

        nodes.push(NodeLog {
            node_id: step.node_id.clone(),
            op: step.op.clone(),
            status,
            rows_in,
            rows_out: data.len(),
            columns_out: data.headers.len(),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        });
    }

    let output = data.to_table();
    let csv = parser::serialize(&output, options.delimiter);

    Ok(ExecutionReport {
        input_rows,
        output,
        csv,
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::PipelineNode;
    use serde_json::json;

    fn pipeline(middle: Vec<PipelineNode>) -> PipelineSpec {
        let mut nodes = vec![PipelineNode::new("in", "parse_csv")];
        nodes.extend(middle);
        nodes.push(PipelineNode::new("out", "output_csv"));
        PipelineSpec::new(nodes)
    }

    #[test]
    fn test_execute_filter_end_to_end() {
        let spec = pipeline(vec![PipelineNode::new("f", "filter")
            .with_config(json!({"condition": "age > 30"}))
            .with_inputs(["in"])]);
        let csv = execute(&spec, "name,age\nAlice,25\nBob,40\n").unwrap();
        assert_eq!(csv, "name,age\nBob,40\n");
    }

    #[test]
    fn test_execute_markers_only_normalizes() {
        let spec = pipeline(Vec::new());
        let csv = execute(&spec, "a , b\r\n1,2\n\n3\n").unwrap();
        assert_eq!(csv, "a,b\n1,2\n3,\n");
    }

    #[test]
    fn test_execute_empty_input() {
        let spec = pipeline(Vec::new());
        // An empty table still writes its (empty) header line.
        assert_eq!(execute(&spec, "").unwrap(), "\n");
        assert_eq!(execute(&spec, "\n\n").unwrap(), "\n");
    }

    #[test]
    fn test_execute_header_only() {
        let spec = pipeline(vec![PipelineNode::new("f", "filter")
            .with_config(json!({"condition": "a == 1"}))]);
        assert_eq!(execute(&spec, "a,b\n").unwrap(), "a,b\n");
    }

    #[test]
    fn test_execute_ignores_inputs_and_order_is_list_order() {
        // `s` references `d` but still runs before it.
        let spec = pipeline(vec![
            PipelineNode::new("s", "select_columns")
                .with_config(json!({"columns": ["email"]}))
                .with_inputs(["d"]),
            PipelineNode::new("d", "dedupe").with_config(json!({"key_columns": ["email"]})),
        ]);
        let csv = execute(&spec, "email,n\na@x.com,1\na@x.com,2\nb@x.com,3\n").unwrap();
        assert_eq!(csv, "email\na@x.com\nb@x.com\n");
    }

    #[test]
    fn test_execute_skips_bad_nodes() {
        let spec = pipeline(vec![
            PipelineNode::new("x", "explode"),
            PipelineNode::new("s", "select_columns").with_config(json!({"columns": "a"})),
            PipelineNode::new("t", "transform").with_config(json!({"column": "a"})),
        ]);
        let report = execute_with(&spec, "a,b\n1,2\n", &RunOptions::default()).unwrap();
        assert_eq!(report.csv, "a,b\n1,2\n");
        assert_eq!(report.skipped().count(), 3);
        assert_eq!(
            report.nodes[1].status,
            NodeStatus::Skipped {
                reason: "unknown operation".into()
            }
        );
    }

    #[test]
    fn test_execute_node_log() {
        let spec = pipeline(vec![PipelineNode::new("f", "filter")
            .with_config(json!({"condition": "age >= 40"}))]);
        let report = execute_with(&spec, "name,age\nA,25\nB,40\n", &RunOptions::default()).unwrap();

        assert_eq!(report.input_rows, 2);
        assert_eq!(report.output_rows(), 1);
        assert_eq!(report.nodes.len(), 3);
        assert_eq!(report.nodes[0].status, NodeStatus::Marker);
        assert_eq!(report.nodes[1].status, NodeStatus::Applied);
        assert_eq!(report.nodes[1].rows_in, 2);
        assert_eq!(report.nodes[1].rows_out, 1);
        assert_eq!(report.nodes[1].columns_out, 2);

        let logged = serde_json::to_value(&report.nodes[1]).unwrap();
        assert_eq!(logged["nodeId"], "f");
        assert_eq!(logged["status"], "applied");
    }

    #[test]
    fn test_execute_does_not_validate() {
        // No parse_csv/output_csv markers: still runs.
        let spec = PipelineSpec::new(vec![PipelineNode::new("t", "transform")
            .with_config(json!({"column": "n", "expression": "upper(value)"}))]);
        assert_eq!(execute(&spec, "n\nab\n").unwrap(), "n\nAB\n");
    }

    #[test]
    fn test_execute_input_too_large() {
        let spec = pipeline(Vec::new());
        let options = RunOptions {
            max_input_bytes: Some(4),
            ..RunOptions::default()
        };
        let err = execute_with(&spec, "a,b\n1,2\n", &options).unwrap_err();
        assert!(matches!(err, ExecutionError::InputTooLarge { size: 8, max: 4 }));

        let unlimited = RunOptions {
            max_input_bytes: None,
            ..RunOptions::default()
        };
        assert!(execute_with(&spec, "a,b\n1,2\n", &unlimited).is_ok());
    }

    #[test]
    fn test_execute_has_no_default_size_cap() {
        let spec = pipeline(Vec::new());
        let input = format!("a\n{}", "x\n".repeat(600_000));
        assert_eq!(execute(&spec, &input).unwrap(), input);
    }

    #[test]
    fn test_execute_custom_delimiter() {
        let spec = pipeline(vec![PipelineNode::new("r", "rename_columns")
            .with_config(json!({"mapping": {"a": "x"}}))]);
        let options = RunOptions {
            delimiter: ';',
            ..RunOptions::default()
        };
        let report = execute_with(&spec, "a;b\n1,5;2\n", &options).unwrap();
        assert_eq!(report.csv, "x;b\n1,5;2\n");
    }

    #[test]
    fn test_execute_json_structural_error() {
        let err = execute_json("{nodes", "a\n1\n").unwrap_err();
        assert!(err.to_string().starts_with("Parse error: "));
    }

    #[test]
    fn test_execute_dates_and_email() {
        let spec = pipeline(vec![
            PipelineNode::new("d", "fix_dates").with_config(json!({"column": "joined"})),
            PipelineNode::new("e", "validate_email")
                .with_config(json!({"column": "email", "strict": true})),
        ]);
        let csv = execute(&spec, "email,joined\nann@x.io,01/15/2024\nbad,soon\n").unwrap();
        assert_eq!(
            csv,
            "email,joined,email_valid\nann@x.io,2024-01-15,true\nbad,soon,false\n"
        );
    }
}
