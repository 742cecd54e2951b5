//! String-in, string-out entry points for embedding hosts.
//!
//! Nothing here panics or returns `Err`: failures come back as an error
//! payload with [`HostStatus::Error`] alongside it.

use serde::Serialize;
use serde_json::json;

use crate::config::RunOptions;
use crate::error::ExecutionError;
use crate::spec::PipelineSpec;
use crate::transform::executor::execute_plan;
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Ok,
    Error,
}

/// Body text plus whether it is a result or an error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResponse {
    pub status: HostStatus,
    pub body: String,
}

impl HostResponse {
    fn ok(body: String) -> Self {
        Self {
            status: HostStatus::Ok,
            body,
        }
    }

    fn error(err: &ExecutionError) -> Self {
        Self {
            status: HostStatus::Error,
            body: error_payload(&format!("Execution error: {err}")),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HostStatus::Ok
    }
}

/// `{"error": true, "message": ...}`
pub fn error_payload(message: &str) -> String {
    json!({ "error": true, "message": message }).to_string()
}

/// Validate raw spec JSON and return the serialized [`ValidationResult`](crate::validation::ValidationResult).
pub fn validate_spec_json(spec_json: &str) -> String {
    let result = validation::validate_json(spec_json);
    serde_json::to_string(&result).unwrap_or_else(|err| error_payload(&err.to_string()))
}

/// Options used by [`run_spec_json`]: defaults, without validate-first.
pub fn host_options() -> RunOptions {
    RunOptions {
        validate: false,
        ..RunOptions::default()
    }
}

/// Execute raw spec JSON over `input_csv`. On success the body is the output CSV.
pub fn run_spec_json(spec_json: &str, input_csv: &str) -> HostResponse {
    run_spec_json_with(spec_json, input_csv, &host_options())
}

pub fn run_spec_json_with(spec_json: &str, input_csv: &str, options: &RunOptions) -> HostResponse {
    let spec = match PipelineSpec::from_json(spec_json) {
        Ok(spec) => spec,
        Err(err) => return HostResponse::error(&ExecutionError::from(err)),
    };

    let checked = validation::check(&spec);
    if options.validate && !checked.is_valid() {
        return HostResponse::error(&ExecutionError::InvalidPipeline(checked.messages()));
    }

    match execute_plan(&checked.plan, input_csv, options) {
        Ok(report) => HostResponse::ok(report.csv),
        Err(err) => HostResponse::error(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationResult;
    use serde_json::Value;

    const FILTER_SPEC: &str = r#"{"nodes":[
        {"id":"in","op":"parse_csv"},
        {"id":"f","op":"filter","config":{"condition":"age > 30"},"inputs":["in"]},
        {"id":"out","op":"output_csv","inputs":["f"]}
    ]}"#;

    const PASSTHROUGH_SPEC: &str = r#"{"nodes":[
        {"id":"in","op":"parse_csv"},
        {"id":"out","op":"output_csv","inputs":["in"]}
    ]}"#;

    #[test]
    fn test_run_ok() {
        let response = run_spec_json(FILTER_SPEC, "name,age\nAlice,25\nBob,40\n");
        assert!(response.is_ok());
        assert_eq!(response.body, "name,age\nBob,40\n");
    }

    #[test]
    fn test_run_parse_error_payload() {
        let response = run_spec_json("{not json", "a\n1\n");
        assert_eq!(response.status, HostStatus::Error);

        let payload: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(payload["error"], true);
        let message = payload["message"].as_str().unwrap();
        assert!(message.starts_with("Execution error: Parse error: "), "{message}");
    }

    #[test]
    fn test_run_without_validation_executes_invalid_pipeline() {
        let spec = r#"{"nodes":[{"id":"t","op":"transform","config":{"column":"a","expression":"upper(value)"}}]}"#;
        let response = run_spec_json(spec, "a\nx\n");
        assert!(response.is_ok());
        assert_eq!(response.body, "a\nX\n");
    }

    #[test]
    fn test_run_with_validation_refuses_invalid_pipeline() {
        let spec = r#"{"nodes":[{"id":"in","op":"parse_csv"}]}"#;
        let response = run_spec_json_with(spec, "a\n1\n", &RunOptions::default());
        assert!(!response.is_ok());
        let payload: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(
            payload["message"],
            "Execution error: Pipeline is invalid: Pipeline must end with output_csv node"
        );
    }

    #[test]
    fn test_run_large_input_not_capped() {
        let big = format!("a\n{}", "x\n".repeat(600_000));
        let response = run_spec_json(PASSTHROUGH_SPEC, &big);
        assert!(response.is_ok());
        assert_eq!(response.body, big);
    }

    #[test]
    fn test_run_input_too_large_with_cap() {
        let options = RunOptions {
            max_input_bytes: Some(4),
            ..host_options()
        };
        let response = run_spec_json_with(FILTER_SPEC, "a\n1\n2\n", &options);
        assert_eq!(response.status, HostStatus::Error);
        assert!(response.body.contains("Input too large"));
    }

    #[test]
    fn test_validate_spec_json() {
        let body = validate_spec_json(FILTER_SPEC);
        let result: ValidationResult = serde_json::from_str(&body).unwrap();
        assert!(result.valid);

        let body = validate_spec_json("[");
        let result: ValidationResult = serde_json::from_str(&body).unwrap();
        assert!(!result.valid);
        assert!(result.errors[0].starts_with("Parse error: "));
    }

    #[test]
    fn test_error_payload_escapes() {
        let payload: Value = serde_json::from_str(&error_payload("say \"hi\"")).unwrap();
        assert_eq!(payload["message"], "say \"hi\"");
    }
}
