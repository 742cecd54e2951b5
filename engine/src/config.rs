//! Run options and host configuration.
//!
//! - [`RunOptions`] - per-run knobs for the library API
//! - [`EngineConfig`] - host settings read from the environment (and `.env`)

use crate::error::{ConfigError, ConfigResult};
use crate::parser::DEFAULT_DELIMITER;
use serde::{Deserialize, Serialize};

/// Default cap on raw CSV input for the CLI and HTTP hosts, in bytes.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 1_000_000;

pub const DEFAULT_PORT: u16 = 3000;

/// Options for a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Field delimiter for both input and output.
    pub delimiter: char,

    /// Run the validator first and refuse invalid pipelines.
    pub validate: bool,

    /// Reject input larger than this many bytes. `None` (the library default)
    /// disables the check; hosts set it from [`EngineConfig`].
    pub max_input_bytes: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            validate: true,
            max_input_bytes: None,
        }
    }
}

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub port: u16,
    pub max_input_bytes: usize,
    pub delimiter: char,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl EngineConfig {
    /// Load `.env` if present, then read `PIPELINE_PORT`, `MAX_INPUT_BYTES`
    /// and `PIPELINE_DELIMITER`.
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("PIPELINE_PORT") {
            config.port = value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("PIPELINE_PORT", &value, e))?;
        }

        if let Some(value) = lookup("MAX_INPUT_BYTES") {
            config.max_input_bytes = value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("MAX_INPUT_BYTES", &value, e))?;
        }

        if let Some(value) = lookup("PIPELINE_DELIMITER") {
            config.delimiter = parse_delimiter(&value)
                .ok_or_else(|| invalid("PIPELINE_DELIMITER", &value, "expected one character"))?;
        }

        Ok(config)
    }

    /// Run options derived from this host configuration.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            delimiter: self.delimiter,
            validate: true,
            max_input_bytes: Some(self.max_input_bytes),
        }
    }
}

/// Accept a single character, or the name `tab` / `\t`.
pub fn parse_delimiter(value: &str) -> Option<char> {
    match value {
        "tab" | "\\t" => Some('\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c != '"' && c != '\n' && c != '\r' => Some(c),
                _ => None,
            }
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
