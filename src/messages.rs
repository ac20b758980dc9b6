//! The envelope exchanged with whoever launches a run.

use std::fmt;

use crate::attack::Magnet;
use crate::automaton::Command;
use crate::driver::Trace;

/// Commands fed to the automaton, one per tick. May be infinite.
pub type CommandStream = Box<dyn Iterator<Item = Option<Command>> + Send>;

/// Request to run one maneuver.
pub struct Start {
    pub commands: CommandStream,
    /// Disturbance applied during the run; a zero offset magnet when absent.
    pub magnet: Option<Box<dyn Magnet>>,
}

impl Start {
    pub fn new<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = Option<Command>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            commands: Box::new(commands.into_iter()),
            magnet: None,
        }
    }

    /// A supervisor that never intervenes.
    pub fn idle() -> Self {
        Self::new(std::iter::repeat(None))
    }

    pub fn with_magnet(mut self, magnet: impl Magnet + 'static) -> Self {
        self.magnet = Some(Box::new(magnet));
        self
    }
}

impl fmt::Debug for Start {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Start")
            .field("commands", &"<CommandStream>")
            .field("magnet", &self.magnet.as_ref().map(|_| "<Magnet>"))
            .finish()
    }
}

/// Outcome of a run that reached a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub history: Trace,
}
