//! # Pipeline Engine - declarative CSV transformation pipelines
//!
//! A pipeline is a JSON document listing nodes; each node names one
//! operation from a closed set plus its config. The engine validates the
//! document's structure and runs the nodes in list order over CSV text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Spec JSON  │────▶│  Validator  │────▶│  Executor   │────▶│  CSV text   │
//! │ + CSV text  │     │ (+ plan)    │     │ (node walk) │     │ + node log  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use pipeline_engine::{execute, validate, PipelineSpec};
//!
//! let spec = PipelineSpec::from_json(r#"{"nodes":[
//!     {"id":"in","op":"parse_csv"},
//!     {"id":"f","op":"filter","config":{"condition":"age > 30"},"inputs":["in"]},
//!     {"id":"out","op":"output_csv","inputs":["f"]}
//! ]}"#).unwrap();
//!
//! assert!(validate(&spec).valid);
//! assert_eq!(execute(&spec, "name,age\nAlice,25\nBob,40\n").unwrap(), "name,age\nBob,40\n");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Table, Record, Dataset
//! - [`parser`] - CSV codec and input decoding
//! - [`spec`] - Pipeline documents, operation vocabulary, execution plan
//! - [`validation`] - Structural validation
//! - [`transform`] - DSL, executor, metrics, run orchestration
//! - [`config`] - Run options and environment configuration
//! - [`api`] - Embedding host, HTTP server, log streaming

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Pipeline documents
pub mod spec;

// Validation
pub mod validation;

// Execution
pub mod transform;

// Hosts
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, CsvError, ExecutionError, ExecutionResult, ServerError, SpecError,
    ValidationError,
};

// =============================================================================
// Re-exports - Models and codec
// =============================================================================

pub use models::{Dataset, Record, Table};
pub use parser::{decode_bytes, parse, read_file, serialize, table_to_json, DEFAULT_DELIMITER};

// =============================================================================
// Re-exports - Pipeline documents
// =============================================================================

pub use spec::{example_spec, ExecutionPlan, OpKind, PipelineNode, PipelineSpec};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{check, is_valid, validate, validate_json, ValidationResult};

// =============================================================================
// Re-exports - Execution
// =============================================================================

pub use transform::dsl::{operations_description, Operation};
pub use transform::executor::{execute, execute_json, ExecutionReport, NodeLog, NodeStatus};
pub use transform::metrics::{RunEval, RunMetrics};
pub use transform::pipeline::{run_pipeline, run_pipeline_json, RunReport};

// =============================================================================
// Re-exports - Configuration and hosts
// =============================================================================

pub use api::host::{run_spec_json, validate_spec_json, HostResponse, HostStatus};
pub use config::{EngineConfig, RunOptions};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
