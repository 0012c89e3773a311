//! The assembled result of one traced run.

use crate::event::TraceEvent;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Everything one run produced, in the shape emitted on stdout.
///
/// `error` is always present in the JSON form, `null` when the run finished
/// cleanly. `execution_trace` holds every event recorded before the run
/// ended, which makes it a partial trace when the script faulted mid-way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Captured print output, concatenated in emission order.
    pub output: String,
    /// Fault description, or `null` for a clean run.
    pub error: Option<String>,
    pub execution_trace: Vec<TraceEvent>,
    /// Wall-clock seconds spent compiling and running, rounded to 4 decimal
    /// places. Never negative.
    pub execution_time: f64,
}

impl ExecutionReport {
    /// Assembles a report from a finished run.
    pub fn new(
        output: String,
        error: Option<String>,
        execution_trace: Vec<TraceEvent>,
        elapsed: Duration,
    ) -> ExecutionReport {
        ExecutionReport {
            output,
            error,
            execution_trace,
            execution_time: round_secs(elapsed.as_secs_f64()),
        }
    }

    /// Builds the minimal report for a host-level input failure: no output,
    /// no trace, an `InputError` description.
    pub fn input_error(message: impl std::fmt::Display) -> ExecutionReport {
        ExecutionReport {
            output: String::new(),
            error: Some(format!("InputError: {message}")),
            execution_trace: Vec::new(),
            execution_time: 0.0,
        }
    }

    /// Folds captured diagnostic-stream text into the error field.
    ///
    /// When the run already faulted the text is appended on its own line;
    /// otherwise it becomes the error by itself. Empty text is ignored.
    pub fn merge_stderr(&mut self, stderr: &str) {
        if stderr.is_empty() {
            return;
        }
        self.error = match self.error.take() {
            Some(error) => Some(format!("{error}\n{stderr}")),
            None => Some(stderr.to_string()),
        };
    }
}

fn round_secs(secs: f64) -> f64 {
    ((secs * 10_000.0).round() / 10_000.0).max(0.0)
}
