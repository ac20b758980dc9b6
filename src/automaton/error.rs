//! Error types for the maneuver automaton.

use super::{Flags, StateId};

/// Indicates that a state was built with flags that do not belong to it.
///
/// This is always a defect in a transition, never a runtime condition to recover from.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("state {state} requires flags {expected:?} but was built with {found:?}")]
pub struct FlagViolation {
    pub state: StateId,
    pub expected: Flags,
    pub found: Flags,
}

/// Indicates that a raw command code is outside the command alphabet.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown command code {code}")]
pub struct InvalidCommand {
    pub code: u32,
}
