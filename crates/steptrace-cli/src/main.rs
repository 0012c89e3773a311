//! Script tracing CLI.
//!
//! Provides the `steptrace` binary: run a script once under the tracing
//! host and print the resulting execution report as JSON on stdout. The
//! script comes from a file path argument, or from stdin when the
//! argument is `-` or absent.
//!
//! Limits are read from the environment: `STEPTRACE_TIMEOUT_SECS`
//! (default 10, 0 disables the deadline) and `STEPTRACE_MAX_OPS`
//! (unset leaves the step budget off).

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use steptrace_core::ExecutionReport;
use steptrace_engine::{HostConfig, ScriptHost};

/// Run a script once and report every execution step as JSON.
#[derive(Parser)]
#[command(name = "steptrace", about = "Run a script once and report every execution step as JSON")]
struct Cli {
    /// Script file to execute; `-` or absent reads from stdin.
    script: Option<PathBuf>,

    /// Emit the report on one line instead of pretty-printed.
    #[arg(long)]
    compact: bool,
}

fn main() {
    // Logs go to stderr so stdout stays a single JSON document.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = run_trace(&cli);
    process::exit(exit_code);
}

/// Execute the traced run.
///
/// Returns exit code: 0 = a report was assembled (script faults included),
/// 1 = the input could not be read.
fn run_trace(cli: &Cli) -> i32 {
    let (script, source) = match read_script(cli.script.as_deref()) {
        Ok(pair) => pair,
        Err(message) => {
            // Input failures still emit a report document.
            let report = ExecutionReport::input_error(&message);
            print_report(&report, cli.compact);
            eprintln!("Error: {}", message);
            return 1;
        }
    };

    tracing::debug!(source = %source, bytes = script.len(), "input loaded");

    let mut config = config_from_env();
    config.script_name = source;
    let report = ScriptHost::new(config).run(&script);
    print_report(&report, cli.compact);
    0
}

/// Read the script text, returning it together with its source label.
fn read_script(path: Option<&Path>) -> Result<(String, String), String> {
    match path {
        Some(path) if path.as_os_str() != "-" => match std::fs::read_to_string(path) {
            Ok(text) => Ok((text, path.display().to_string())),
            Err(e) => Err(format!("failed to read '{}': {}", path.display(), e)),
        },
        _ => {
            let mut text = String::new();
            match std::io::stdin().read_to_string(&mut text) {
                Ok(_) => Ok((text, "<stdin>".to_string())),
                Err(e) => Err(format!("failed to read stdin: {}", e)),
            }
        }
    }
}

/// Build the host configuration from environment variables.
fn config_from_env() -> HostConfig {
    let mut config = HostConfig::default();

    if let Some(secs) = std::env::var("STEPTRACE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }

    if let Some(budget) = std::env::var("STEPTRACE_MAX_OPS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        config.max_operations = (budget > 0).then_some(budget);
    }

    config
}

/// Print the report as JSON to stdout for machine-readable output.
fn print_report(report: &ExecutionReport, compact: bool) {
    let json = if compact {
        serde_json::to_string(report)
    } else {
        serde_json::to_string_pretty(report)
    }
    .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize report: {}\"}}", e));
    println!("{}", json);
}
