//! Error types for the pipeline engine.
//!
//! - [`CsvError`] - reading or decoding raw CSV input
//! - [`SpecError`] - pipeline JSON that does not decode into a [`crate::spec::PipelineSpec`]
//! - [`ValidationError`] - one rule violation found by the validator
//! - [`ExecutionError`] - conditions the executor cannot recover from
//! - [`ConfigError`] - invalid environment configuration
//! - [`ServerError`] - HTTP host errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Input Errors
// =============================================================================

/// Errors while reading raw CSV input.
///
/// The codec itself never fails; these only come from the byte layer.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode bytes with the detected encoding.
    #[error("Failed to decode input: {0}")]
    EncodingError(String),
}

// =============================================================================
// Structural Spec Errors
// =============================================================================

/// The pipeline document does not have the expected shape.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Malformed JSON or wrong value kinds.
    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read the spec file.
    #[error("Parse error: cannot read spec: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A single rule violation. `Display` yields the message reported to authors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Pipeline must have at least one node")]
    EmptyPipeline,

    #[error("Node missing required 'id' field")]
    MissingId,

    #[error("Duplicate node ID: {0}")]
    DuplicateId(String),

    #[error("Node {node}: missing 'op' field")]
    MissingOp { node: String },

    #[error("Node {node}: unknown operation '{op}'")]
    UnknownOperation { node: String, op: String },

    #[error("Node {node}: references unknown input '{input}'")]
    UnknownInput { node: String, input: String },

    #[error("Node {node}: {op} requires '{field}' {shape}")]
    MissingConfig {
        node: String,
        op: &'static str,
        field: &'static str,
        shape: &'static str,
    },

    #[error("Pipeline must start with {0} node")]
    MustStartWith(&'static str),

    #[error("Pipeline must end with {0} node")]
    MustEndWith(&'static str),

    #[error("Node {node}: creates cycle by referencing '{input}'")]
    Cycle { node: String, input: String },
}

// =============================================================================
// Execution Errors
// =============================================================================

/// Errors that abort a whole run. Per-node problems never end up here.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The pipeline document could not be decoded.
    #[error("{0}")]
    Spec(#[from] SpecError),

    /// Raw input could not be read.
    #[error("{0}")]
    Csv(#[from] CsvError),

    /// Input exceeds the configured size limit.
    #[error("Input too large: {size} bytes (max: {max})")]
    InputTooLarge { size: usize, max: usize },

    /// Validation was requested and the pipeline failed it.
    #[error("Pipeline is invalid: {}", .0.join("; "))]
    InvalidPipeline(Vec<String>),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline run failed.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for raw input operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for spec decoding.
pub type SpecResult<T> = Result<T, SpecError>;

/// Result type for pipeline execution.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
