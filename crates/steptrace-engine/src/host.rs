//! Script execution host.
//!
//! A [`ScriptHost`] runs one script end to end: it builds a fresh engine
//! and scope, redirects the print and debug streams into per-run buffers,
//! installs the instrumentation hook, enforces the configured limits, and
//! assembles the final [`ExecutionReport`].
//!
//! Every run gets its own engine, so stream redirection and session state
//! cannot leak between runs and are released when the run ends, on every
//! path.

use crate::error::ScriptFault;
use crate::tracer::{self, SnapshotPolicy, TraceSession};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use steptrace_core::ExecutionReport;
use tracing::{debug, warn};

/// Limits and labels for a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Label used as the engine source of the script and as the `filename`
    /// of every event.
    pub script_name: String,
    /// Wall-clock deadline for one run. `None` disables it.
    pub timeout: Option<Duration>,
    /// Operation budget for one run. `None` disables it.
    pub max_operations: Option<u64>,
    /// Maximum call nesting before the run is aborted.
    pub max_call_depth: usize,
    pub snapshot: SnapshotPolicy,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            script_name: "script".to_string(),
            timeout: Some(Duration::from_secs(10)),
            max_operations: None,
            max_call_depth: 256,
            snapshot: SnapshotPolicy::default(),
        }
    }
}

/// Runs scripts under instrumentation.
pub struct ScriptHost {
    config: HostConfig,
}

impl Default for ScriptHost {
    fn default() -> Self {
        ScriptHost::new(HostConfig::default())
    }
}

impl ScriptHost {
    pub fn new(config: HostConfig) -> ScriptHost {
        ScriptHost { config }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Runs one script and assembles its report.
    ///
    /// Script failures of any kind (including the deadline) are recovered:
    /// the report carries the fault description and the partial trace.
    /// This method itself cannot fail.
    pub fn run(&self, script: &str) -> ExecutionReport {
        let started = Instant::now();
        let session = Rc::new(RefCell::new(TraceSession::new(
            &self.config.script_name,
            self.config.snapshot.clone(),
        )));
        let output = Rc::new(RefCell::new(String::new()));
        let diagnostics = Rc::new(RefCell::new(String::new()));

        let engine = self.build_engine(started, &session, &output, &diagnostics);
        debug!(bytes = script.len(), "starting traced run");

        let fault = match engine.compile(script) {
            Ok(mut ast) => {
                ast.set_source(self.config.script_name.as_str());
                let mut scope = rhai::Scope::new();
                match engine.eval_ast_with_scope::<rhai::Dynamic>(&mut scope, &ast) {
                    Ok(_) => None,
                    Err(err) => {
                        let fault = ScriptFault::from_eval(&err);
                        session.borrow_mut().record_abort(&fault);
                        Some(fault)
                    }
                }
            }
            Err(err) => Some(ScriptFault::from_parse(&err)),
        };

        let elapsed = started.elapsed();
        if let Some(fault) = &fault {
            warn!(%fault, "script faulted");
        }
        let events = session.borrow_mut().take_events();
        debug!(events = events.len(), ?elapsed, "run finished");

        let mut report = ExecutionReport::new(
            output.borrow().clone(),
            fault.map(|fault| fault.to_string()),
            events,
            elapsed,
        );
        report.merge_stderr(diagnostics.borrow().trim_end());
        report
    }

    fn build_engine(
        &self,
        started: Instant,
        session: &Rc<RefCell<TraceSession>>,
        output: &Rc<RefCell<String>>,
        diagnostics: &Rc<RefCell<String>>,
    ) -> rhai::Engine {
        let mut engine = rhai::Engine::new();
        // Folding would drop statements from the trace.
        engine.set_optimization_level(rhai::OptimizationLevel::None);
        engine.set_max_call_levels(self.config.max_call_depth);
        if let Some(budget) = self.config.max_operations {
            engine.set_max_operations(budget);
        }

        let sink = Rc::clone(output);
        engine.on_print(move |text| {
            let mut sink = sink.borrow_mut();
            sink.push_str(text);
            sink.push('\n');
        });
        let sink = Rc::clone(diagnostics);
        engine.on_debug(move |text, _source, _pos| {
            let mut sink = sink.borrow_mut();
            sink.push_str(text);
            sink.push('\n');
        });

        if let Some(deadline) = self.config.timeout {
            engine.on_progress(move |operations| {
                // Deadline check every 1024 operations.
                if operations & 0x3FF == 0 && started.elapsed() >= deadline {
                    Some("deadline".into())
                } else {
                    None
                }
            });
        }

        tracer::install(&mut engine, Rc::clone(session));
        engine
    }
}
