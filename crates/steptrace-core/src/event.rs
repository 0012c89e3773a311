//! Trace event records.
//!
//! A [`TraceEvent`] is one observation made while the script runs: a line
//! about to execute, a function call, a function return, or an exception.
//! Events are recorded in exact execution order; the payload fields beyond
//! the common header depend on the event kind and are omitted from the JSON
//! form when absent.

use crate::frame::FrameId;
use crate::value::TraceValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The kind of observation an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Line,
    Call,
    Return,
    Exception,
}

/// One observation from a traced run.
///
/// Every event carries the common header (`event`, `line_no`, `filename`,
/// `frame_id`, `timestamp`); the remaining fields are kind-specific:
///
/// - `line`: `variables` holds the snapshot of locals visible before the
///   line runs (present even when empty).
/// - `call`: `function_name` names the callee.
/// - `return`: `function_name` plus `return_value` when one was produced.
/// - `exception`: `exception_type` and `exception_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub event: EventKind,
    pub line_no: u32,
    pub filename: String,
    pub frame_id: FrameId,
    /// Seconds elapsed since the run started.
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<IndexMap<String, TraceValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_value: Option<String>,
}

impl TraceEvent {
    /// Builds a `line` event with the given variable snapshot.
    pub fn line(
        line_no: u32,
        filename: impl Into<String>,
        frame_id: FrameId,
        timestamp: f64,
        variables: IndexMap<String, TraceValue>,
    ) -> TraceEvent {
        TraceEvent {
            event: EventKind::Line,
            line_no,
            filename: filename.into(),
            frame_id,
            timestamp,
            function_name: None,
            variables: Some(variables),
            return_value: None,
            exception_type: None,
            exception_value: None,
        }
    }

    /// Builds a `call` event for entry into `function_name`.
    pub fn call(
        line_no: u32,
        filename: impl Into<String>,
        frame_id: FrameId,
        timestamp: f64,
        function_name: impl Into<String>,
    ) -> TraceEvent {
        TraceEvent {
            event: EventKind::Call,
            line_no,
            filename: filename.into(),
            frame_id,
            timestamp,
            function_name: Some(function_name.into()),
            variables: None,
            return_value: None,
            exception_type: None,
            exception_value: None,
        }
    }

    /// Builds a `return` event. `return_value` is `None` when the frame
    /// produced no value worth reporting (the top-level frame, for one).
    pub fn ret(
        line_no: u32,
        filename: impl Into<String>,
        frame_id: FrameId,
        timestamp: f64,
        function_name: impl Into<String>,
        return_value: Option<String>,
    ) -> TraceEvent {
        TraceEvent {
            event: EventKind::Return,
            line_no,
            filename: filename.into(),
            frame_id,
            timestamp,
            function_name: Some(function_name.into()),
            variables: None,
            return_value,
            exception_type: None,
            exception_value: None,
        }
    }

    /// Builds an `exception` event.
    pub fn exception(
        line_no: u32,
        filename: impl Into<String>,
        frame_id: FrameId,
        timestamp: f64,
        exception_type: impl Into<String>,
        exception_value: impl Into<String>,
    ) -> TraceEvent {
        TraceEvent {
            event: EventKind::Exception,
            line_no,
            filename: filename.into(),
            frame_id,
            timestamp,
            function_name: None,
            variables: None,
            return_value: None,
            exception_type: Some(exception_type.into()),
            exception_value: Some(exception_value.into()),
        }
    }
}
