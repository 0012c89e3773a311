//! Per-run trace state.
//!
//! A [`TraceSession`] holds everything one traced run accumulates: the frame
//! registry, the mirror of the engine's call stack, and the ordered event
//! log. Sessions are created per run and dropped with it; no state outlives
//! the run or leaks into the next one.

use crate::error::ScriptFault;
use crate::tracer::snapshot::{snapshot_scope, snapshot_value, SnapshotPolicy};
use smallvec::SmallVec;
use std::time::Instant;
use steptrace_core::{FrameId, TraceEvent};

/// Hands out frame labels in first-seen order.
///
/// Labels identify frames only; the registry never holds the frames
/// themselves, so it cannot keep engine state alive.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    next: u64,
}

impl FrameRegistry {
    pub fn new() -> FrameRegistry {
        FrameRegistry::default()
    }

    /// Returns the next label. Labels are never reused within a session.
    pub fn allocate(&mut self) -> FrameId {
        let id = FrameId(self.next);
        self.next += 1;
        id
    }

    /// How many labels have been handed out.
    pub fn allocated(&self) -> u64 {
        self.next
    }
}

/// One entry of the mirrored call stack.
#[derive(Debug)]
struct ActiveFrame {
    id: FrameId,
    function_name: String,
    call_line: u32,
    last_line: Option<u32>,
}

impl ActiveFrame {
    fn current_line(&self) -> u32 {
        self.last_line.unwrap_or(self.call_line)
    }
}

/// Accumulated state of one traced run.
pub struct TraceSession {
    script_name: String,
    policy: SnapshotPolicy,
    started: Instant,
    registry: FrameRegistry,
    stack: SmallVec<[ActiveFrame; 8]>,
    events: Vec<TraceEvent>,
}

impl TraceSession {
    pub fn new(script_name: impl Into<String>, policy: SnapshotPolicy) -> TraceSession {
        TraceSession {
            script_name: script_name.into(),
            policy,
            started: Instant::now(),
            registry: FrameRegistry::new(),
            stack: SmallVec::new(),
            events: Vec::new(),
        }
    }

    /// The label events carry in their `filename` field, and the source
    /// events are filtered against.
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// Current depth of the mirrored call stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Events recorded so far, in execution order.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Drains the recorded events, leaving the session empty.
    pub fn take_events(&mut self) -> Vec<TraceEvent> {
        std::mem::take(&mut self.events)
    }

    /// The line of the most recent line event in the current frame.
    pub(crate) fn last_recorded_line(&self) -> Option<u32> {
        self.stack.last().and_then(|frame| frame.last_line)
    }

    /// Name of the frame currently on top of the mirror.
    pub(crate) fn top_frame_name(&self) -> Option<&str> {
        self.stack.last().map(|frame| frame.function_name.as_str())
    }

    /// Opens a frame: records the call event and pushes the mirror entry.
    pub(crate) fn open_frame(&mut self, function_name: &str, line: u32) {
        let id = self.registry.allocate();
        let timestamp = self.elapsed();
        self.events.push(TraceEvent::call(
            line,
            self.script_name.clone(),
            id,
            timestamp,
            function_name,
        ));
        self.stack.push(ActiveFrame {
            id,
            function_name: function_name.to_string(),
            call_line: line,
            last_line: None,
        });
    }

    /// Records a line event with a snapshot of the visible bindings.
    pub(crate) fn record_line(&mut self, line: u32, scope: &rhai::Scope) {
        let Some(id) = self.stack.last().map(|frame| frame.id) else {
            return;
        };
        let variables = snapshot_scope(scope, &self.policy);
        let timestamp = self.elapsed();
        self.events.push(TraceEvent::line(
            line,
            self.script_name.clone(),
            id,
            timestamp,
            variables,
        ));
        if let Some(frame) = self.stack.last_mut() {
            frame.last_line = Some(line);
        }
    }

    /// Closes the top frame with a return event. Without an explicit line
    /// the frame's last observed line is used.
    pub(crate) fn close_frame(&mut self, line: Option<u32>, return_value: Option<String>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let line = line.unwrap_or_else(|| frame.current_line());
        let timestamp = self.elapsed();
        self.events.push(TraceEvent::ret(
            line,
            self.script_name.clone(),
            frame.id,
            timestamp,
            frame.function_name,
            return_value,
        ));
    }

    /// Records the fault unwinding through the top frame: an exception
    /// event at the frame's current line, then the closing return.
    pub(crate) fn record_unwind(&mut self, fault: &ScriptFault) {
        let (id, line) = match self.stack.last() {
            Some(frame) => (frame.id, frame.current_line()),
            None => return,
        };
        let timestamp = self.elapsed();
        self.events.push(TraceEvent::exception(
            line,
            self.script_name.clone(),
            id,
            timestamp,
            fault.condition(),
            fault.detail(),
        ));
        self.close_frame(Some(line), None);
    }

    /// Records a fault that ended the run: every still-open frame unwinds,
    /// innermost first. The event log stays intact as the partial trace.
    pub fn record_abort(&mut self, fault: &ScriptFault) {
        while !self.stack.is_empty() {
            self.record_unwind(fault);
        }
    }

    /// Closes every still-open frame after a clean run.
    pub(crate) fn finish(&mut self) {
        while !self.stack.is_empty() {
            self.close_frame(None, None);
        }
    }

    /// Renders a return value through the snapshot tiers.
    pub(crate) fn render_return(&self, value: &rhai::Dynamic) -> String {
        snapshot_value(value, &self.policy).to_string()
    }

    fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steptrace_core::EventKind;

    fn session() -> TraceSession {
        TraceSession::new("script", SnapshotPolicy::default())
    }

    fn kinds(session: &TraceSession) -> Vec<EventKind> {
        session.events().iter().map(|event| event.event).collect()
    }

    #[test]
    fn frame_labels_follow_first_seen_order() {
        let mut session = session();
        session.open_frame("<script>", 1);
        session.open_frame("alpha", 2);
        session.open_frame("beta", 3);

        let ids: Vec<FrameId> = session.events().iter().map(|e| e.frame_id).collect();
        assert_eq!(ids, [FrameId(0), FrameId(1), FrameId(2)]);
        assert_eq!(session.depth(), 3);
    }

    #[test]
    fn registry_never_reuses_labels() {
        let mut registry = FrameRegistry::new();
        let first = registry.allocate();
        let second = registry.allocate();
        assert_ne!(first, second);
        assert_eq!(registry.allocated(), 2);
    }

    #[test]
    fn line_events_snapshot_the_scope() {
        let mut scope = rhai::Scope::new();
        scope.push("x", 1_i64);

        let mut session = session();
        session.open_frame("<script>", 1);
        session.record_line(1, &scope);

        let event = &session.events()[1];
        assert_eq!(event.event, EventKind::Line);
        assert_eq!(event.frame_id, FrameId(0));
        let variables = event.variables.as_ref().unwrap();
        assert!(variables.contains_key("x"));
    }

    #[test]
    fn close_without_line_uses_last_observed_line() {
        let scope = rhai::Scope::new();
        let mut session = session();
        session.open_frame("<script>", 1);
        session.record_line(4, &scope);
        session.finish();

        let last = session.events().last().unwrap();
        assert_eq!(last.event, EventKind::Return);
        assert_eq!(last.line_no, 4);
        assert_eq!(last.return_value, None);
        assert_eq!(session.depth(), 0);
    }

    #[test]
    fn abort_unwinds_every_open_frame_innermost_first() {
        let mut session = session();
        session.open_frame("<script>", 1);
        session.open_frame("inner", 2);

        let fault = ScriptFault::Arithmetic {
            message: "Division by zero: 1 / 0".to_string(),
            line: Some(2),
        };
        session.record_abort(&fault);

        assert_eq!(
            kinds(&session),
            [
                EventKind::Call,
                EventKind::Call,
                EventKind::Exception,
                EventKind::Return,
                EventKind::Exception,
                EventKind::Return,
            ]
        );
        let exceptions: Vec<FrameId> = session
            .events()
            .iter()
            .filter(|e| e.event == EventKind::Exception)
            .map(|e| e.frame_id)
            .collect();
        assert_eq!(exceptions, [FrameId(1), FrameId(0)]);
        for event in session.events().iter().filter(|e| e.event == EventKind::Exception) {
            assert_eq!(event.exception_type.as_deref(), Some("ArithmeticError"));
        }
        assert_eq!(session.depth(), 0);
    }

    #[test]
    fn timestamps_never_decrease() {
        let scope = rhai::Scope::new();
        let mut session = session();
        session.open_frame("<script>", 1);
        session.record_line(1, &scope);
        session.record_line(2, &scope);
        session.finish();

        let stamps: Vec<f64> = session.events().iter().map(|e| e.timestamp).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn take_events_leaves_the_session_empty() {
        let mut session = session();
        session.open_frame("<script>", 1);
        let events = session.take_events();
        assert_eq!(events.len(), 1);
        assert!(session.events().is_empty());
    }
}
