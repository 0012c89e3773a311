//! Execution instrumentation.
//!
//! The tracer mirrors the engine's execution as an event log. Three pieces
//! cooperate per run:
//!
//! - [`TraceSession`] accumulates events and mirrors the call stack, with
//!   frame labels handed out by [`FrameRegistry`] in first-seen order.
//! - The debug hook (installed by the host) observes every evaluated node
//!   and decides what each one contributes to the log.
//! - [`snapshot_scope`] captures visible bindings as wire-safe values under
//!   a [`SnapshotPolicy`].
//!
//! Sessions are per run. Nothing in this module touches global state.

mod hook;
mod session;
mod snapshot;

pub use session::{FrameRegistry, TraceSession};
pub use snapshot::{snapshot_scope, snapshot_value, SnapshotPolicy};

pub(crate) use hook::install;
