//! Debug-hook wiring.
//!
//! Installs the observation callback on an engine and translates raw
//! debugger events into session records. The callback always answers
//! step-into so every node is observed, including function bodies; what
//! gets recorded is decided here per event.

use crate::error::ScriptFault;
use crate::tracer::session::TraceSession;
use rhai::debugger::{CallStackFrame, DebuggerCommand, DebuggerEvent};
use rhai::{ASTNode, Engine, EvalContext, Position};
use std::cell::RefCell;
use std::rc::Rc;

/// Name of the synthetic top-level frame.
pub(crate) const TOP_FRAME_NAME: &str = "<script>";

/// Wires the session into the engine's debugging interface.
///
/// The host keeps its own handle to the session and collects the events
/// after evaluation; the callback only ever borrows it for the duration of
/// one observation.
#[allow(deprecated)] // the debugging interface is marked volatile, not removed
pub(crate) fn install(engine: &mut Engine, session: Rc<RefCell<TraceSession>>) {
    engine.register_debugger(
        |_, debugger| debugger,
        move |context, event, node, source, pos| {
            observe(&mut session.borrow_mut(), &context, event, node, source, pos);
            Ok(DebuggerCommand::StepInto)
        },
    );
}

/// Translates one debugger event into session records.
fn observe(
    session: &mut TraceSession,
    context: &EvalContext,
    event: DebuggerEvent,
    node: ASTNode,
    source: Option<&str>,
    pos: Position,
) {
    // Filtering is per event: stepping continues through foreign sources,
    // but nothing they execute is recorded.
    if source.unwrap_or("") != session.script_name() {
        return;
    }

    match event {
        DebuggerEvent::Start => {
            // Fires on the first executed node, which doubles as the first
            // step of the top-level frame.
            let line = line_of(pos).unwrap_or(1);
            session.open_frame(TOP_FRAME_NAME, line);
            step(session, context, node, pos);
        }
        DebuggerEvent::Step | DebuggerEvent::BreakPoint(_) => {
            reconcile(session, context, pos);
            step(session, context, node, pos);
        }
        DebuggerEvent::FunctionExitWithValue(value) => {
            if exiting_mirrored_frame(session, context) {
                let rendered = session.render_return(value);
                session.close_frame(line_of(pos), Some(rendered));
            }
        }
        DebuggerEvent::FunctionExitWithError(err) => {
            if exiting_mirrored_frame(session, context) {
                session.record_unwind(&ScriptFault::from_eval(err));
            }
        }
        DebuggerEvent::End => session.finish(),
        _ => {}
    }
}

/// Records a line event for the observed node, if it warrants one.
///
/// Statements always do. Expressions only when they move execution to a new
/// line; this covers expression statements (which surface as their inner
/// expression) and loop headers on re-entry, without recording every
/// subexpression of a line.
fn step(session: &mut TraceSession, context: &EvalContext, node: ASTNode, pos: Position) {
    let Some(line) = line_of(pos) else {
        return;
    };
    match node {
        // Noop markers: function-body entries and empty statements.
        ASTNode::Stmt(stmt) if stmt.is_noop() => {}
        ASTNode::Stmt(_) => session.record_line(line, context.scope()),
        ASTNode::Expr(_) => {
            if session.last_recorded_line() != Some(line) {
                session.record_line(line, context.scope());
            }
        }
        _ => {}
    }
}

/// Brings the mirror in line with the engine's call stack.
///
/// Script-function entry fires exactly one marker event with the new frame
/// already on the engine's stack, so growth is normally a single frame. The
/// engine also stacks frames for native calls; those become visible here
/// only when a native invokes a script callback, and the shrink loop closes
/// any of them whose exit event the gate did not take.
fn reconcile(session: &mut TraceSession, context: &EvalContext, pos: Position) {
    let stack = call_stack(context);
    let engine_frames = stack.len();
    let target = engine_frames + 1;
    while session.depth() > target {
        session.close_frame(None, None);
    }
    while session.depth() < target {
        let index = session.depth().checked_sub(1);
        let frame = index.and_then(|index| stack.get(index));
        let name = frame.map_or_else(
            || TOP_FRAME_NAME.to_string(),
            |frame| frame.fn_name.to_string(),
        );
        // The innermost frame fired this event from its body start, which
        // is the callback position. Frames opened transitively (native
        // callers of script callbacks) use their call sites instead.
        let line = match (index, frame) {
            (Some(index), Some(frame)) if index + 1 < engine_frames => {
                line_of(frame.pos).or_else(|| line_of(pos))
            }
            _ => line_of(pos),
        }
        .unwrap_or(1);
        session.open_frame(&name, line);
    }
}

/// Frames currently on the engine's debugger call stack.
fn call_stack<'a>(context: &'a EvalContext) -> &'a [CallStackFrame] {
    context
        .debugger()
        .map_or(&[][..], |debugger| debugger.call_stack())
}

/// Whether a function-exit event belongs to the frame mirrored on top.
///
/// Exit events also fire for native calls the mirror never opened (print,
/// operators); closing on those would split the enclosing frame across two
/// ids. The exiting frame is still on the engine's call stack, so the
/// mirror owns it exactly when it sits one above the stack and the names
/// agree. The synthetic top-level frame never closes from an exit event.
fn exiting_mirrored_frame(session: &TraceSession, context: &EvalContext) -> bool {
    if session.depth() < 2 {
        return false;
    }
    let stack = call_stack(context);
    session.depth() == stack.len() + 1
        && stack
            .last()
            .is_some_and(|frame| session.top_frame_name() == Some(frame.fn_name.as_str()))
}

fn line_of(pos: Position) -> Option<u32> {
    pos.line().map(|line| line as u32)
}
