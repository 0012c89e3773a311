//! Fault taxonomy for script runs.
//!
//! Everything that can go wrong inside a script run is classified as a
//! [`ScriptFault`]. The Display form is the wire contract for the report's
//! `error` field: `Condition: detail`, with ` (line N)` appended when the
//! engine attributed the failure to a line. The condition name also appears
//! verbatim as the `exception_type` of the trailing exception event. Faults
//! are recoverable by construction; the host still assembles a report (with
//! whatever trace was recorded) after any of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A classified script failure.
///
/// `line` is the 1-based script line the engine attributed the failure to,
/// when it reported one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ScriptFault {
    Syntax { message: String, line: Option<u32> },

    Arithmetic { message: String, line: Option<u32> },

    VariableNotFound { name: String, line: Option<u32> },

    FunctionNotFound {
        signature: String,
        line: Option<u32>,
    },

    TypeMismatch {
        expected: String,
        actual: String,
        line: Option<u32>,
    },

    IndexOutOfBounds {
        index: i64,
        len: usize,
        line: Option<u32>,
    },

    StackOverflow { line: Option<u32> },

    OperationLimit { line: Option<u32> },

    Timeout { line: Option<u32> },

    DataLimit { message: String, line: Option<u32> },

    Runtime { message: String, line: Option<u32> },
}

impl fmt::Display for ScriptFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.condition(), self.detail())?;
        if let Some(line) = self.line() {
            write!(f, " (line {line})")?;
        }
        Ok(())
    }
}

impl ScriptFault {
    /// The condition name, as used for `exception_type`.
    pub fn condition(&self) -> &'static str {
        match self {
            ScriptFault::Syntax { .. } => "SyntaxError",
            ScriptFault::Arithmetic { .. } => "ArithmeticError",
            ScriptFault::VariableNotFound { .. } => "VariableNotFound",
            ScriptFault::FunctionNotFound { .. } => "FunctionNotFound",
            ScriptFault::TypeMismatch { .. } => "TypeMismatch",
            ScriptFault::IndexOutOfBounds { .. } => "IndexOutOfBounds",
            ScriptFault::StackOverflow { .. } => "StackOverflow",
            ScriptFault::OperationLimit { .. } => "OperationLimit",
            ScriptFault::Timeout { .. } => "Timeout",
            ScriptFault::DataLimit { .. } => "DataLimit",
            ScriptFault::Runtime { .. } => "RuntimeError",
        }
    }

    /// The human-readable part, as used for `exception_value`.
    ///
    /// The line is not part of the detail: exception events carry it in
    /// `line_no`, and Display appends it for the report's `error` text.
    pub fn detail(&self) -> String {
        match self {
            ScriptFault::Syntax { message, .. } => message.clone(),
            ScriptFault::Arithmetic { message, .. } => message.clone(),
            ScriptFault::VariableNotFound { name, .. } => {
                format!("variable '{name}' is not defined")
            }
            ScriptFault::FunctionNotFound { signature, .. } => {
                format!("no function matches '{signature}'")
            }
            ScriptFault::TypeMismatch {
                expected, actual, ..
            } => format!("expected {expected}, got {actual}"),
            ScriptFault::IndexOutOfBounds { index, len, .. } => {
                format!("index {index} is out of bounds for length {len}")
            }
            ScriptFault::StackOverflow { .. } => {
                "call nesting exceeded the configured limit".to_string()
            }
            ScriptFault::OperationLimit { .. } => "operation budget exhausted".to_string(),
            ScriptFault::Timeout { .. } => {
                "execution exceeded the configured deadline".to_string()
            }
            ScriptFault::DataLimit { message, .. } => message.clone(),
            ScriptFault::Runtime { message, .. } => message.clone(),
        }
    }

    /// The script line the fault was attributed to, if any.
    pub fn line(&self) -> Option<u32> {
        match self {
            ScriptFault::Syntax { line, .. }
            | ScriptFault::Arithmetic { line, .. }
            | ScriptFault::VariableNotFound { line, .. }
            | ScriptFault::FunctionNotFound { line, .. }
            | ScriptFault::TypeMismatch { line, .. }
            | ScriptFault::IndexOutOfBounds { line, .. }
            | ScriptFault::StackOverflow { line, .. }
            | ScriptFault::OperationLimit { line, .. }
            | ScriptFault::Timeout { line, .. }
            | ScriptFault::DataLimit { line, .. }
            | ScriptFault::Runtime { line, .. } => *line,
        }
    }

    /// Classifies a compile failure.
    pub fn from_parse(err: &rhai::ParseError) -> ScriptFault {
        ScriptFault::Syntax {
            message: err.0.to_string(),
            line: line_of(err.1),
        }
    }

    /// Classifies an evaluation failure.
    ///
    /// Errors that crossed function boundaries arrive wrapped once per
    /// frame; classification always looks at the root cause, so the same
    /// script failure maps to the same condition no matter how deep it
    /// happened.
    pub fn from_eval(err: &rhai::EvalAltResult) -> ScriptFault {
        use rhai::EvalAltResult as E;

        let root = root_cause(err);
        let line = line_of(root.position());
        match root {
            E::ErrorParsing(inner, pos) => ScriptFault::Syntax {
                message: inner.to_string(),
                line: line_of(*pos),
            },
            E::ErrorVariableNotFound(name, _) => ScriptFault::VariableNotFound {
                name: name.clone(),
                line,
            },
            E::ErrorFunctionNotFound(signature, _) => ScriptFault::FunctionNotFound {
                signature: signature.clone(),
                line,
            },
            E::ErrorMismatchDataType(expected, actual, _)
            | E::ErrorMismatchOutputType(expected, actual, _) => ScriptFault::TypeMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
                line,
            },
            E::ErrorArrayBounds(len, index, _)
            | E::ErrorStringBounds(len, index, _)
            | E::ErrorBitFieldBounds(len, index, _) => ScriptFault::IndexOutOfBounds {
                index: *index,
                len: *len,
                line,
            },
            E::ErrorArithmetic(message, _) => ScriptFault::Arithmetic {
                message: message.clone(),
                line,
            },
            E::ErrorStackOverflow(_) => ScriptFault::StackOverflow { line },
            E::ErrorTooManyOperations(_) => ScriptFault::OperationLimit { line },
            E::ErrorTerminated(_, _) => ScriptFault::Timeout { line },
            E::ErrorDataTooLarge(what, _) => ScriptFault::DataLimit {
                message: format!("{what} exceeds the configured limit"),
                line,
            },
            E::ErrorRuntime(value, _) => {
                let message = value.to_string();
                ScriptFault::Runtime {
                    message: if message.is_empty() {
                        "script raised an exception".to_string()
                    } else {
                        message
                    },
                    line,
                }
            }
            other => ScriptFault::Runtime {
                message: other.to_string(),
                line,
            },
        }
    }
}

/// Strips per-frame wrapping down to the original failure.
fn root_cause(err: &rhai::EvalAltResult) -> &rhai::EvalAltResult {
    match err {
        rhai::EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => root_cause(inner),
        other => other,
    }
}

fn line_of(pos: rhai::Position) -> Option<u32> {
    pos.line().map(|l| l as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::{EvalAltResult, Position};

    fn sample_faults() -> Vec<ScriptFault> {
        vec![
            ScriptFault::Syntax {
                message: "unexpected token".to_string(),
                line: Some(1),
            },
            ScriptFault::Arithmetic {
                message: "Division by zero: 1 / 0".to_string(),
                line: Some(2),
            },
            ScriptFault::VariableNotFound {
                name: "y".to_string(),
                line: Some(3),
            },
            ScriptFault::FunctionNotFound {
                signature: "frobnicate ()".to_string(),
                line: None,
            },
            ScriptFault::TypeMismatch {
                expected: "int".to_string(),
                actual: "string".to_string(),
                line: None,
            },
            ScriptFault::IndexOutOfBounds {
                index: 5,
                len: 3,
                line: Some(4),
            },
            ScriptFault::StackOverflow { line: Some(1) },
            ScriptFault::OperationLimit { line: None },
            ScriptFault::Timeout { line: None },
            ScriptFault::DataLimit {
                message: "Size of array exceeds the configured limit".to_string(),
                line: None,
            },
            ScriptFault::Runtime {
                message: "boom".to_string(),
                line: Some(7),
            },
        ]
    }

    #[test]
    fn display_is_condition_detail_and_line() {
        for fault in sample_faults() {
            let expected = match fault.line() {
                Some(line) => {
                    format!("{}: {} (line {})", fault.condition(), fault.detail(), line)
                }
                None => format!("{}: {}", fault.condition(), fault.detail()),
            };
            assert_eq!(
                fault.to_string(),
                expected,
                "display drifted from condition/detail for {fault:?}"
            );
        }
    }

    #[test]
    fn condition_names_are_distinct() {
        let faults = sample_faults();
        for (i, a) in faults.iter().enumerate() {
            for b in &faults[i + 1..] {
                assert_ne!(a.condition(), b.condition());
            }
        }
    }

    #[test]
    fn division_by_zero_classifies_as_arithmetic() {
        let err = EvalAltResult::ErrorArithmetic(
            "Division by zero: 1 / 0".to_string(),
            Position::new(2, 5),
        );
        let fault = ScriptFault::from_eval(&err);
        assert_eq!(fault.condition(), "ArithmeticError");
        assert_eq!(fault.detail(), "Division by zero: 1 / 0");
        assert_eq!(fault.line(), Some(2));
    }

    #[test]
    fn wrapped_errors_classify_by_root_cause() {
        let inner = EvalAltResult::ErrorVariableNotFound("y".to_string(), Position::new(3, 1));
        let outer = EvalAltResult::ErrorInFunctionCall(
            "inner_fn".to_string(),
            String::new(),
            inner.into(),
            Position::new(1, 1),
        );
        let wrapped = EvalAltResult::ErrorInFunctionCall(
            "outer_fn".to_string(),
            String::new(),
            outer.into(),
            Position::new(5, 1),
        );

        let fault = ScriptFault::from_eval(&wrapped);
        assert!(
            matches!(&fault, ScriptFault::VariableNotFound { name, .. } if name == "y"),
            "expected root-cause classification, got {fault:?}"
        );
        assert_eq!(fault.line(), Some(3));
    }

    #[test]
    fn termination_token_classifies_as_timeout() {
        let err = EvalAltResult::ErrorTerminated("deadline".into(), Position::new(9, 1));
        let fault = ScriptFault::from_eval(&err);
        assert_eq!(fault.condition(), "Timeout");
        assert_eq!(fault.line(), Some(9));
    }

    #[test]
    fn empty_throw_still_has_a_message() {
        let err = EvalAltResult::ErrorRuntime(rhai::Dynamic::UNIT, Position::new(1, 1));
        let fault = ScriptFault::from_eval(&err);
        assert_eq!(
            fault.to_string(),
            "RuntimeError: script raised an exception (line 1)"
        );
    }

    #[test]
    fn parse_failures_carry_the_line() {
        let engine = rhai::Engine::new();
        let err = match engine.compile("let x = ;") {
            Err(err) => err,
            Ok(_) => panic!("expected a parse failure"),
        };
        let fault = ScriptFault::from_parse(&err);
        assert_eq!(fault.condition(), "SyntaxError");
        assert!(fault.line().is_some());
        assert!(!fault.detail().is_empty());
    }
}
