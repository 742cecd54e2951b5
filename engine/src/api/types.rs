//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{parse_delimiter, EngineConfig, RunOptions};
use crate::error::{ServerError, ServerResult};

/// Body of `POST /api/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// The pipeline document, as a JSON object.
    pub spec: Value,
    /// CSV input text.
    pub csv: String,
    /// Single-character delimiter; the server default when absent.
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Validate before running; true when absent.
    #[serde(default)]
    pub validate: Option<bool>,
}

impl RunRequest {
    /// Combine request overrides with the server configuration.
    pub fn run_options(&self, config: &EngineConfig) -> ServerResult<RunOptions> {
        let mut options = config.run_options();
        if let Some(ref delimiter) = self.delimiter {
            options.delimiter = parse_delimiter(delimiter).ok_or_else(|| {
                ServerError::BadRequest(format!("invalid delimiter '{delimiter}'"))
            })?;
        }
        if let Some(validate) = self.validate {
            options.validate = validate;
        }
        Ok(options)
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub max_input_bytes: usize,
}

/// Create an error response
pub fn error_response(message: &str) -> Value {
    json!({
        "error": true,
        "message": message,
    })
}
