//! Pipeline CLI - validate and run declarative CSV pipelines
//!
//! # Main Commands
//!
//! ```bash
//! pipeline run spec.json input.csv      # Run a pipeline, CSV to stdout
//! pipeline validate spec.json           # Check a pipeline document
//! pipeline serve                        # Start HTTP server (port 3000)
//! ```
//!
//! # Helper Commands
//!
//! ```bash
//! pipeline parse input.csv              # Parse CSV to JSON records
//! pipeline operations                   # Show available operations
//! pipeline example-spec                 # Print an example pipeline
//! ```

use clap::{Parser, Subcommand};
use pipeline_engine::api::logs::{log_info, log_success, log_warning};
use pipeline_engine::config::parse_delimiter;
use pipeline_engine::transform::pipeline::run_pipeline_bytes;
use pipeline_engine::{
    example_spec, operations_description, read_file, table_to_json, validate, EngineConfig,
    PipelineSpec,
};
use std::fs;
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "pipeline")]
#[command(about = "Validate and run declarative CSV transformation pipelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a pipeline document
    Validate {
        /// Pipeline spec (JSON)
        spec: PathBuf,
    },

    /// Run a pipeline over a CSV file
    Run {
        /// Pipeline spec (JSON)
        spec: PathBuf,

        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (single character or "tab")
        #[arg(short, long, value_parser = delimiter_arg)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run even if the pipeline does not validate
        #[arg(long)]
        skip_validation: bool,

        /// Write the run report (JSON) to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Parse a CSV file and output JSON records
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (single character or "tab")
        #[arg(short, long, value_parser = delimiter_arg)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show available operations
    Operations,

    /// Show an example pipeline
    ExampleSpec,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: PIPELINE_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match EngineConfig::from_env() {
        Ok(config) => run_command(cli.command, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("✗ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(command: Commands, config: EngineConfig) -> CliResult {
    match command {
        Commands::Validate { spec } => cmd_validate(&spec),

        Commands::Run {
            spec,
            input,
            delimiter,
            output,
            skip_validation,
            report,
        } => {
            let mut options = config.run_options();
            options.delimiter = delimiter.unwrap_or(config.delimiter);
            options.validate = !skip_validation;
            cmd_run(&spec, &input, options, output.as_deref(), report.as_deref()).await
        }

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter.unwrap_or(config.delimiter), output.as_deref()),

        Commands::Operations => cmd_operations(),

        Commands::ExampleSpec => cmd_example_spec(),

        Commands::Serve { port } => {
            let config = EngineConfig {
                port: port.unwrap_or(config.port),
                ..config
            };
            cmd_serve(config).await
        }
    }
}

fn delimiter_arg(value: &str) -> Result<char, String> {
    parse_delimiter(value).ok_or_else(|| format!("expected a single character, got '{value}'"))
}

fn cmd_validate(spec_path: &Path) -> CliResult {
    eprintln!("Validating: {}", spec_path.display());

    let spec = PipelineSpec::from_file(spec_path)?;
    let result = validate(&spec);

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.valid {
        for err in &result.errors {
            eprintln!("   - {}", err);
        }
        std::process::exit(1);
    }

    eprintln!("✓ Pipeline valid ({} nodes)", spec.nodes.len());
    Ok(())
}

async fn cmd_run(
    spec_path: &Path,
    input: &Path,
    options: pipeline_engine::RunOptions,
    output: Option<&Path>,
    report_path: Option<&Path>,
) -> CliResult {
    log_info(format!("Processing: {}", input.display()));

    let spec = PipelineSpec::from_file(spec_path)?;
    let bytes = tokio::fs::read(input).await?;

    if !options.validate {
        log_warning("Validation skipped");
    }

    let report = run_pipeline_bytes(&spec, &bytes, &options)?;

    write_output(&report.output_csv, output)?;

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json).await?;
        log_success(format!("Report written to: {}", path.display()));
    }

    Ok(())
}

fn cmd_parse(input: &Path, delimiter: char, output: Option<&Path>) -> CliResult {
    eprintln!("Parsing CSV: {}", input.display());

    let decoded = read_file(input)?;
    let table = pipeline_engine::parse(&decoded.text, delimiter);

    eprintln!("   Encoding: {}", decoded.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(delimiter));
    eprintln!("   Columns: {}", table.headers.join(", "));
    eprintln!("✓ Parsed {} records", table.rows.len());

    let json = serde_json::to_string_pretty(&table_to_json(&table))?;
    write_output(&format!("{json}\n"), output)?;

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn cmd_operations() -> CliResult {
    println!("{}", operations_description());
    Ok(())
}

fn cmd_example_spec() -> CliResult {
    println!("{}", example_spec().to_json_pretty()?);
    Ok(())
}

async fn cmd_serve(config: EngineConfig) -> CliResult {
    pipeline_engine::server::start_server(config).await?;
    Ok(())
}

/// Write to `path`, or to stdout when there is none. `content` is written as is.
fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
