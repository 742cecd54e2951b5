//! Run metrics and a coarse quality evaluation of a run's output.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::Table;
use crate::spec::ExecutionPlan;
use crate::transform::dsl::Operation;

/// Highest share of empty output cells that still counts as clean.
pub const MAX_NULL_RATE: f64 = 0.2;

/// Runs at or above this many milliseconds fail the performance check.
pub const SLOW_RUN_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub input_rows: usize,
    pub output_rows: usize,
    /// Empty output cells / all output cells; 0 when there are none.
    pub null_rate: f64,
    pub exec_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEval {
    pub schema_match: bool,
    pub constraint_pass: bool,
    pub exec_success: bool,
    /// Weighted 0.3 / 0.4 / 0.3 over the three flags above.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

impl QualityCheck {
    fn new(name: &str, passed: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed,
            message: message.into(),
        }
    }
}

pub fn compute_metrics(input_rows: usize, output: &Table, exec_time_ms: u64) -> RunMetrics {
    RunMetrics {
        input_rows,
        output_rows: output.rows.len(),
        null_rate: null_rate(output),
        exec_time_ms,
    }
}

pub fn null_rate(table: &Table) -> f64 {
    let (empty, total) = table
        .cells()
        .fold((0usize, 0usize), |(empty, total), cell| {
            (empty + usize::from(cell.is_empty()), total + 1)
        });
    if total == 0 {
        0.0
    } else {
        empty as f64 / total as f64
    }
}

pub fn evaluate_run(
    plan: &ExecutionPlan,
    input_rows: usize,
    output: &Table,
    validation_errors: &[String],
) -> RunEval {
    let schema_match = check_schema_match(plan, output);
    let constraint_pass = check_constraints(plan, input_rows, output);
    let exec_success = validation_errors.is_empty() && !output.rows.is_empty();

    let mut score = 0.0;
    if schema_match {
        score += 0.3;
    }
    if constraint_pass {
        score += 0.4;
    }
    if exec_success {
        score += 0.3;
    }

    RunEval {
        schema_match,
        constraint_pass,
        exec_success,
        score,
    }
}

/// Every column of the first `select_columns` step must be in the output.
fn check_schema_match(plan: &ExecutionPlan, output: &Table) -> bool {
    let selected = plan.operations().find_map(|op| match op {
        Operation::SelectColumns { columns } => Some(columns),
        _ => None,
    });

    selected.map_or(true, |columns| {
        columns.iter().all(|c| output.headers.contains(c))
    })
}

fn check_constraints(plan: &ExecutionPlan, input_rows: usize, output: &Table) -> bool {
    let dedupe_keys = plan.operations().find_map(|op| match op {
        Operation::Dedupe { key_columns } => Some(key_columns),
        _ => None,
    });

    if let Some(key_columns) = dedupe_keys {
        let Some(indices) = key_columns
            .iter()
            .map(|c| output.column_index(c))
            .collect::<Option<Vec<_>>>()
        else {
            return false;
        };

        let mut seen = HashSet::new();
        for row in &output.rows {
            let key: Vec<&str> = indices
                .iter()
                .map(|&i| row.get(i).map_or("", String::as_str))
                .collect();
            if !seen.insert(key) {
                return false;
            }
        }
    }

    let has_filter = plan
        .operations()
        .any(|op| matches!(op, Operation::Filter { .. }));
    if !has_filter && input_rows > 0 && output.rows.is_empty() {
        return false;
    }

    null_rate(output) <= MAX_NULL_RATE
}

/// Named pass/fail checks for display.
pub fn quality_checks(metrics: &RunMetrics, eval: &RunEval) -> Vec<QualityCheck> {
    let reduction = if metrics.input_rows > 0 {
        (metrics.input_rows as f64 - metrics.output_rows as f64) / metrics.input_rows as f64
            * 100.0
    } else {
        0.0
    };
    let null_pct = metrics.null_rate * 100.0;
    let clean = metrics.null_rate <= MAX_NULL_RATE;

    vec![
        QualityCheck::new(
            "Schema Match",
            eval.schema_match,
            if eval.schema_match {
                "Output columns match expected schema"
            } else {
                "Output columns do not match expected schema"
            },
        ),
        QualityCheck::new(
            "Constraints",
            eval.constraint_pass,
            if eval.constraint_pass {
                "All data constraints satisfied"
            } else {
                "One or more constraints failed"
            },
        ),
        QualityCheck::new(
            "Row Count",
            true,
            format!("{} rows output ({reduction:.1}% reduction)", metrics.output_rows),
        ),
        QualityCheck::new(
            "Data Quality",
            clean,
            if clean {
                format!("Null rate: {null_pct:.1}%")
            } else {
                format!("High null rate: {null_pct:.1}%")
            },
        ),
        QualityCheck::new(
            "Performance",
            metrics.exec_time_ms < SLOW_RUN_MS,
            format!("Executed in {}ms", metrics.exec_time_ms),
        ),
    ]
}
