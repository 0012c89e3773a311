//! Payload schema for the downstream indexing service.
//!
//! After a run completes, the script text and its trace can be flattened
//! into searchable documents. The indexing service itself lives elsewhere;
//! this module only fixes the payload shapes it consumes, so the schema has
//! to stay stable across both sides.

use crate::event::{EventKind, TraceEvent};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// One traced run, addressed for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub job_id: Uuid,
    pub script_text: String,
    pub execution_trace: Vec<TraceEvent>,
}

/// Which part of a run a document describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// The script body itself.
    Code,
    /// A single trace event.
    Trace,
}

/// One searchable document derived from a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDocument {
    pub job_id: Uuid,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    /// Stable label within the job: `job-code` for the script body,
    /// `trace-<i>` for the i-th trace event.
    pub source: String,
    pub line_no: u32,
    pub text: String,
}

impl IndexRequest {
    /// Addresses a run under a fresh job id.
    pub fn new(script_text: impl Into<String>, execution_trace: Vec<TraceEvent>) -> IndexRequest {
        IndexRequest {
            job_id: Uuid::new_v4(),
            script_text: script_text.into(),
            execution_trace,
        }
    }

    /// Flattens the run into documents: the script body first, then one
    /// document per trace event in trace order.
    pub fn documents(&self) -> Vec<TraceDocument> {
        let mut documents = Vec::with_capacity(self.execution_trace.len() + 1);
        documents.push(TraceDocument {
            job_id: self.job_id,
            kind: DocumentKind::Code,
            source: "job-code".to_string(),
            line_no: 0,
            text: self.script_text.clone(),
        });
        for (i, event) in self.execution_trace.iter().enumerate() {
            documents.push(TraceDocument {
                job_id: self.job_id,
                kind: DocumentKind::Trace,
                source: format!("trace-{i}"),
                line_no: event.line_no,
                text: render_event(event),
            });
        }
        documents
    }
}

/// Renders one event as document text.
fn render_event(event: &TraceEvent) -> String {
    match event.event {
        EventKind::Line => {
            let mut text = format!("Line {}: {{", event.line_no);
            if let Some(variables) = &event.variables {
                for (i, (name, value)) in variables.iter().enumerate() {
                    if i > 0 {
                        text.push_str(", ");
                    }
                    // Infallible for String targets.
                    let _ = write!(text, "{name}: {value}");
                }
            }
            text.push('}');
            text
        }
        EventKind::Call => format!(
            "Call to {} at line {}",
            event.function_name.as_deref().unwrap_or("<anonymous>"),
            event.line_no
        ),
        EventKind::Return => format!(
            "Return from {} at line {}",
            event.function_name.as_deref().unwrap_or("<anonymous>"),
            event.line_no
        ),
        EventKind::Exception => format!(
            "Exception {} at line {}: {}",
            event.exception_type.as_deref().unwrap_or("Error"),
            event.line_no,
            event.exception_value.as_deref().unwrap_or("")
        ),
    }
}
