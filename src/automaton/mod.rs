//! The hybrid maneuver automaton.
//!
//! Discrete states S1..S9 whose transition guards read continuous quantities from the vehicle:
//!
//! ```text
//! S1 settle --5 ticks--> S2 drive --7m--> S3 turn --70deg--> S4 gps --> S5 drive --7m--> S6 stop
//!                         |abort           |abort                        |abort
//!                         v                v                             v
//!                         S6               S8 turn --> S7 move --continue--> S9 stop
//!                                                         \--otherwise--> S6 stop
//! ```

pub mod error;
mod flags;
mod state;

use tracing::debug;

pub use self::error::{FlagViolation, InvalidCommand};
pub use self::flags::Flags;
pub use self::state::{LEG_DISTANCE, Phase, SETTLE_TICKS, State, StateId, TURN_DEGREES};
use crate::vehicle::Vehicle;

/// An external supervisor input. A tick without a command is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Finish through the continue terminal. Only meaningful in S7.
    Continue = 55,
    /// Cut the current continuous phase short.
    Abort = 66,
}

impl Command {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = InvalidCommand;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            55 => Ok(Command::Continue),
            66 => Ok(Command::Abort),
            code => Err(InvalidCommand { code: code.into() }),
        }
    }
}

/// Owns the current state and the history of every state it has left, and drives the vehicle
/// to the motion each new state commands.
#[derive(Debug)]
pub struct Automaton<V> {
    vehicle: V,
    state: State,
    history: Vec<State>,
}

impl<V: Vehicle> Automaton<V> {
    pub fn new(vehicle: V) -> Self {
        Self {
            vehicle,
            state: State::initial(),
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Every state the automaton has stepped out of, oldest first.
    pub fn history(&self) -> &[State] {
        &self.history
    }

    pub fn vehicle(&self) -> &V {
        &self.vehicle
    }

    /// Advance by one transition.
    ///
    /// The current state is recorded before the transition and the vehicle is actuated after it,
    /// so history holds pre-transition states and the vehicle follows the new state.
    pub fn step(&mut self, cmd: Option<Command>) -> Result<(), FlagViolation> {
        self.history.push(self.state);

        let next = self.state.next(cmd, &self.vehicle)?;
        debug!(from = %self.state, to = %next, ?cmd, "Stepped automaton");
        self.state = next;

        self.vehicle.set_velocity(next.velocity());
        self.vehicle.set_omega(next.omega());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::testing::{batch, drain, rover};

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::try_from(55), Ok(Command::Continue));
        assert_eq!(Command::try_from(66), Ok(Command::Abort));
        assert_eq!(Command::Abort.code(), 66);
        assert_eq!(Command::try_from(0), Err(InvalidCommand { code: 0 }));
    }

    #[test]
    fn test_history_holds_pre_transition_states() {
        let (rover, _rx) = rover();
        let mut automaton = Automaton::new(rover);
        let mut expected = Vec::new();

        for _ in 0..8 {
            expected.push(*automaton.state());
            automaton.step(None).unwrap();
        }

        assert_eq!(automaton.history(), expected.as_slice());
        assert_eq!(automaton.history()[0], State::initial());
        assert_eq!(automaton.state().id(), StateId::S2);
    }

    #[test]
    fn test_step_actuates_new_state() {
        let (rover, mut rx) = rover();
        let mut automaton = Automaton::new(rover);

        for _ in 0..=SETTLE_TICKS {
            automaton.step(None).unwrap();
        }
        assert_eq!(automaton.state().id(), StateId::S2);
        assert_eq!(drain(&mut rx), vec![[-1.0, 1.0]]);

        // Steady driving publishes nothing new.
        automaton.step(None).unwrap();
        assert!(drain(&mut rx).is_empty());

        automaton.step(Some(Command::Abort)).unwrap();
        assert_eq!(automaton.state().id(), StateId::S6);
        assert_eq!(drain(&mut rx), vec![[0.0, 0.0]]);
        assert_eq!(automaton.vehicle().velocity(), 0.0);
        assert_eq!(automaton.vehicle().omega(), 0.0);
    }

    #[test]
    fn test_abort_from_turn_reaches_move_only() {
        let (rover, mut rx) = rover();
        let mut automaton = Automaton::new(rover);

        for _ in 0..=SETTLE_TICKS {
            automaton.step(None).unwrap();
        }
        automaton.vehicle().pose_estimator().observe(batch(1.0, 7.0, 0.0, 0.0));
        automaton.step(None).unwrap();
        assert_eq!(automaton.state().id(), StateId::S3);

        automaton.step(Some(Command::Abort)).unwrap();
        assert_eq!(automaton.state().id(), StateId::S8);
        automaton.step(None).unwrap();
        assert_eq!(automaton.state().id(), StateId::S7);
        automaton.step(Some(Command::Continue)).unwrap();
        assert_eq!(automaton.state().id(), StateId::S9);

        assert_eq!(
            drain(&mut rx),
            vec![
                [-1.0, 1.0], // S2 drive
                [0.0, 0.0],  // S3 stop driving
                [1.0, 1.0],  // S3 turn
                [-1.0, 1.0], // S7 drive
                [0.0, 0.0],  // S7 stop turning
                [0.0, 0.0],  // S9 stop driving
            ]
        );
    }

    #[test]
    fn test_random_walks_keep_flags_consistent() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let (rover, _rx) = rover();
            let mut automaton = Automaton::new(rover);

            for tick in 0..60 {
                let (x, heading) = (rng.random_range(-20.0..20.0), rng.random_range(-180.0..180.0));
                automaton
                    .vehicle()
                    .pose_estimator()
                    .observe(batch(f64::from(tick), x, 0.0, heading));

                let cmd = match rng.random_range(0..10) {
                    0 => Some(Command::Abort),
                    1 => Some(Command::Continue),
                    _ => None,
                };
                automaton.step(cmd).expect("reachable states keep their flags");

                let state = automaton.state();
                assert_eq!(state.flags(), state.id().flags());
            }
        }
    }
}
