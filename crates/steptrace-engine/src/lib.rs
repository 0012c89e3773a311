//! Traced script execution on an embedded engine.
//!
//! This crate runs a script once and records everything it does: each line
//! about to execute, every call and return with its frame, and any fault,
//! all as [`steptrace_core`] events. The pieces:
//!
//! - [`host`]: the [`ScriptHost`](host::ScriptHost) that owns one run end
//!   to end and assembles the [`ExecutionReport`](steptrace_core::ExecutionReport).
//! - [`tracer`]: the instrumentation layer behind the engine's debugging
//!   interface.
//! - [`error`]: the [`ScriptFault`] taxonomy, which doubles as the wire
//!   format for reported errors.
//!
//! Execution is single threaded and per-run: a host builds a fresh engine,
//! scope, and session for every script, so no state survives a run.

pub mod error;
pub mod host;
pub mod tracer;

// Re-export commonly used types
pub use error::ScriptFault;
pub use host::{HostConfig, ScriptHost};
pub use tracer::{FrameRegistry, SnapshotPolicy, TraceSession};
