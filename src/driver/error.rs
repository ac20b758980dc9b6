//! Error types for a driver run.

use thiserror::Error;

use super::Trace;
use crate::automaton::FlagViolation;

/// Errors that end a run before it reaches a terminal state.
///
/// Variants raised after ticking started carry the steps recorded so far.
#[derive(Debug, Error)]
pub enum RunError {
    /// The command stream ran dry while the automaton still needed input.
    #[error("command stream exhausted after {} ticks without reaching a terminal state", .trace.len())]
    CommandsExhausted { trace: Trace },

    /// A transition built a state with inconsistent flags.
    #[error("automaton invariant violated after {} ticks", .trace.len())]
    Invariant {
        #[source]
        violation: FlagViolation,
        trace: Trace,
    },

    /// The run was stopped from outside between two ticks.
    #[error("run cancelled after {} ticks", .trace.len())]
    Cancelled { trace: Trace },

    /// The configured tick frequency does not give a usable period.
    #[error("tick frequency must be positive and finite, got {0} Hz")]
    InvalidFrequency(f64),
}

impl RunError {
    /// The steps recorded before the run failed, if ticking had started.
    pub fn trace(&self) -> Option<&Trace> {
        match self {
            RunError::CommandsExhausted { trace }
            | RunError::Invariant { trace, .. }
            | RunError::Cancelled { trace } => Some(trace),
            RunError::InvalidFrequency(_) => None,
        }
    }
}
