use std::fmt;

use super::error::FlagViolation;
use super::{Command, Flags};
use crate::vehicle::{Model, Position};

/// Ticks spent settling in [`StateId::S1`] before driving off.
pub const SETTLE_TICKS: u32 = 5;
/// Distance covered by each straight leg.
pub const LEG_DISTANCE: f64 = 7.0;
/// Heading change, in degrees, that ends the turn.
pub const TURN_DEGREES: f64 = 70.0;

/// Tag of a [`State`], used for logging and for looking up the legal flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateId {
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
}

impl StateId {
    /// The only flag combination a state with this tag may carry.
    pub const fn flags(self) -> Flags {
        let none = Flags::NONE;
        match self {
            StateId::S1 => Flags {
                check_position: true,
                ..none
            },
            StateId::S2 => Flags {
                autodrive: true,
                check_position: true,
                ..none
            },
            StateId::S3 => Flags {
                autodrive: true,
                update_compass: true,
                ..none
            },
            StateId::S4 => Flags {
                autodrive: true,
                update_gps: true,
                ..none
            },
            StateId::S5 => Flags {
                autodrive: true,
                moving: true,
                ..none
            },
            StateId::S7 => Flags {
                moving: true,
                ..none
            },
            StateId::S8 => Flags {
                update_compass: true,
                ..none
            },
            StateId::S6 | StateId::S9 => none,
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The phase of the maneuver together with the values anchored on entering it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Settle in place, counting ticks.
    S1 { tick: u32 },
    /// Drive straight until [`LEG_DISTANCE`] away from `anchor`.
    S2 { anchor: Position },
    /// Turn until the heading is [`TURN_DEGREES`] away from `anchor_heading`.
    S3 { anchor_heading: f64 },
    /// Reacquire the GPS reference, lasts one tick.
    S4,
    /// Drive to the exit, [`LEG_DISTANCE`] away from `anchor`.
    S5 { anchor: Position },
    /// Stopped. Terminal.
    S6,
    /// Keep moving after the exit leg was aborted.
    S7,
    /// Keep turning after the turn was aborted, lasts one tick.
    S8,
    /// Stopped after being told to continue from [`Phase::S7`]. Terminal.
    S9,
}

impl Phase {
    pub const fn id(&self) -> StateId {
        match self {
            Phase::S1 { .. } => StateId::S1,
            Phase::S2 { .. } => StateId::S2,
            Phase::S3 { .. } => StateId::S3,
            Phase::S4 => StateId::S4,
            Phase::S5 { .. } => StateId::S5,
            Phase::S6 => StateId::S6,
            Phase::S7 => StateId::S7,
            Phase::S8 => StateId::S8,
            Phase::S9 => StateId::S9,
        }
    }
}

/// An immutable state of the maneuver automaton.
///
/// States can only be built through [`State::new`], which rejects flags that do not match the
/// phase, so every state value in existence (including every entry in an automaton's history)
/// carries consistent flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    phase: Phase,
    flags: Flags,
}

impl State {
    pub fn new(phase: Phase, flags: Flags) -> Result<State, FlagViolation> {
        let expected = phase.id().flags();

        if flags != expected {
            return Err(FlagViolation {
                state: phase.id(),
                expected,
                found: flags,
            });
        }

        Ok(State { phase, flags })
    }

    /// The settle state with a zeroed tick counter.
    pub const fn initial() -> State {
        State {
            phase: Phase::S1 { tick: 0 },
            flags: Flags::initial(),
        }
    }

    pub const fn id(&self) -> StateId {
        self.phase.id()
    }

    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Commanded linear velocity while in this state.
    pub const fn velocity(&self) -> f64 {
        match self.phase {
            Phase::S2 { .. } | Phase::S5 { .. } | Phase::S7 => 1.0,
            _ => 0.0,
        }
    }

    /// Commanded angular velocity while in this state.
    pub const fn omega(&self) -> f64 {
        match self.phase {
            Phase::S3 { .. } | Phase::S4 | Phase::S8 => 1.0,
            _ => 0.0,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::S6 | Phase::S9)
    }

    /// Compute the successor state for `cmd`, reading guards from `model`.
    ///
    /// An abort takes precedence over any guard that happens to be satisfied in the same tick.
    pub fn next<M>(&self, cmd: Option<Command>, model: &M) -> Result<State, FlagViolation>
    where
        M: Model + ?Sized,
    {
        let flags = self.flags;

        match self.phase {
            Phase::S1 { tick } if tick >= SETTLE_TICKS => State::new(
                Phase::S2 {
                    anchor: model.position(),
                },
                Flags {
                    autodrive: true,
                    ..flags
                },
            ),
            Phase::S1 { tick } => State::new(Phase::S1 { tick: tick + 1 }, flags),

            Phase::S2 { .. } if cmd == Some(Command::Abort) => State::new(
                Phase::S6,
                Flags {
                    autodrive: false,
                    check_position: false,
                    ..flags
                },
            ),
            Phase::S2 { anchor } if model.position().distance(&anchor) >= LEG_DISTANCE => {
                State::new(
                    Phase::S3 {
                        anchor_heading: model.heading(),
                    },
                    Flags {
                        check_position: false,
                        update_compass: true,
                        ..flags
                    },
                )
            }

            Phase::S3 { .. } if cmd == Some(Command::Abort) => State::new(
                Phase::S8,
                Flags {
                    autodrive: false,
                    check_position: false,
                    ..flags
                },
            ),
            Phase::S3 { anchor_heading }
                if (model.heading() - anchor_heading).abs() >= TURN_DEGREES =>
            {
                State::new(
                    Phase::S4,
                    Flags {
                        update_compass: false,
                        update_gps: true,
                        ..flags
                    },
                )
            }

            Phase::S4 => State::new(
                Phase::S5 {
                    anchor: model.position(),
                },
                Flags {
                    update_gps: false,
                    moving: true,
                    ..flags
                },
            ),

            Phase::S5 { .. } if cmd == Some(Command::Abort) => State::new(
                Phase::S7,
                Flags {
                    autodrive: false,
                    check_position: false,
                    ..flags
                },
            ),
            Phase::S5 { anchor } if model.position().distance(&anchor) >= LEG_DISTANCE => {
                State::new(
                    Phase::S6,
                    Flags {
                        autodrive: false,
                        moving: false,
                        ..flags
                    },
                )
            }

            Phase::S7 if cmd == Some(Command::Continue) => State::new(
                Phase::S9,
                Flags {
                    moving: false,
                    ..flags
                },
            ),
            Phase::S7 => State::new(
                Phase::S6,
                Flags {
                    moving: false,
                    ..flags
                },
            ),

            Phase::S8 => State::new(
                Phase::S7,
                Flags {
                    update_compass: false,
                    moving: true,
                    ..flags
                },
            ),

            // Guards not met, or terminal: stay put.
            Phase::S2 { .. }
            | Phase::S3 { .. }
            | Phase::S5 { .. }
            | Phase::S6
            | Phase::S9 => State::new(self.phase, flags),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            Phase::S1 { tick } => write!(f, "S1(tick={tick})"),
            Phase::S2 { anchor } | Phase::S5 { anchor } => write!(
                f,
                "{}(anchor=({}, {}, {}))",
                self.id(),
                anchor.x,
                anchor.y,
                anchor.z
            ),
            Phase::S3 { anchor_heading } => write!(f, "S3(anchor_heading={anchor_heading})"),
            _ => write!(f, "{}", self.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::Pose;

    const COMMANDS: [Option<Command>; 3] = [None, Some(Command::Continue), Some(Command::Abort)];

    struct FixedModel(Pose);

    impl FixedModel {
        fn at(x: f64, y: f64, heading: f64) -> Self {
            Self(Pose {
                position: Position::new(x, y, 0.0),
                heading,
                ..Pose::default()
            })
        }
    }

    impl Model for FixedModel {
        fn pose(&self) -> Pose {
            self.0
        }
    }

    fn state(phase: Phase) -> State {
        State::new(phase, phase.id().flags()).unwrap()
    }

    #[test]
    fn test_mismatched_flags_are_rejected() {
        let anchor = Position::default();
        let result = State::new(Phase::S2 { anchor }, Flags::initial());

        let err = result.unwrap_err();
        assert_eq!(err.state, StateId::S2);
        assert_eq!(err.found, Flags::initial());
        assert!(err.expected.autodrive);
    }

    fn every_phase() -> [Phase; 9] {
        let anchor = Position::new(1.0, 2.0, 0.0);
        [
            Phase::S1 { tick: 0 },
            Phase::S2 { anchor },
            Phase::S3 {
                anchor_heading: 10.0,
            },
            Phase::S4,
            Phase::S5 { anchor },
            Phase::S6,
            Phase::S7,
            Phase::S8,
            Phase::S9,
        ]
    }

    fn single_flag_flips(flags: Flags) -> [Flags; 5] {
        [
            Flags {
                autodrive: !flags.autodrive,
                ..flags
            },
            Flags {
                update_compass: !flags.update_compass,
                ..flags
            },
            Flags {
                update_gps: !flags.update_gps,
                ..flags
            },
            Flags {
                check_position: !flags.check_position,
                ..flags
            },
            Flags {
                moving: !flags.moving,
                ..flags
            },
        ]
    }

    #[test]
    fn test_every_state_rejects_any_single_flag_flip() {
        for phase in every_phase() {
            let legal = phase.id().flags();
            assert!(State::new(phase, legal).is_ok(), "{}", phase.id());

            for flags in single_flag_flips(legal) {
                let err = State::new(phase, flags).unwrap_err();
                assert_eq!(err.state, phase.id());
                assert_eq!(err.expected, legal);
                assert_eq!(err.found, flags);
            }
        }
    }

    #[test]
    fn test_settle_counts_ticks() {
        let model = FixedModel::at(0.0, 0.0, 0.0);
        let mut current = State::initial();

        for expected in 1..=SETTLE_TICKS {
            current = current.next(None, &model).unwrap();
            assert_eq!(*current.phase(), Phase::S1 { tick: expected });
        }

        let next = current.next(None, &model).unwrap();
        assert_eq!(next.id(), StateId::S2);
        assert_eq!(
            *next.phase(),
            Phase::S2 {
                anchor: Position::default()
            }
        );
    }

    #[test]
    fn test_settle_ignores_abort() {
        let model = FixedModel::at(0.0, 0.0, 0.0);
        let next = State::initial().next(Some(Command::Abort), &model).unwrap();
        assert_eq!(*next.phase(), Phase::S1 { tick: 1 });
    }

    #[test]
    fn test_distance_guard_is_inclusive() {
        let s2 = state(Phase::S2 {
            anchor: Position::default(),
        });

        let short = s2.next(None, &FixedModel::at(6.999, 0.0, 12.0)).unwrap();
        assert_eq!(short, s2);

        let reached = s2.next(None, &FixedModel::at(0.0, 7.0, 12.0)).unwrap();
        assert_eq!(
            *reached.phase(),
            Phase::S3 {
                anchor_heading: 12.0
            }
        );
    }

    #[test]
    fn test_heading_guard_is_inclusive() {
        let s3 = state(Phase::S3 {
            anchor_heading: 0.0,
        });

        assert_eq!(s3.next(None, &FixedModel::at(0.0, 0.0, 69.9)).unwrap(), s3);
        assert_eq!(
            s3.next(None, &FixedModel::at(0.0, 0.0, 70.0)).unwrap().id(),
            StateId::S4
        );
        assert_eq!(
            s3.next(None, &FixedModel::at(0.0, 0.0, -70.0)).unwrap().id(),
            StateId::S4
        );
    }

    #[test]
    fn test_abort_takes_precedence_over_guards() {
        // Every guard below is satisfied, the abort must still win.
        let model = FixedModel::at(10.0, 0.0, 90.0);
        let cases = [
            (
                Phase::S2 {
                    anchor: Position::default(),
                },
                StateId::S6,
            ),
            (
                Phase::S3 {
                    anchor_heading: 0.0,
                },
                StateId::S8,
            ),
            (
                Phase::S5 {
                    anchor: Position::default(),
                },
                StateId::S7,
            ),
        ];

        for (phase, expected) in cases {
            let next = state(phase).next(Some(Command::Abort), &model).unwrap();
            assert_eq!(next.id(), expected, "abort from {}", phase.id());
        }
    }

    #[test]
    fn test_unconditional_states() {
        let model = FixedModel::at(3.0, 4.0, 0.0);

        for cmd in COMMANDS {
            let s5 = state(Phase::S4).next(cmd, &model).unwrap();
            assert_eq!(
                *s5.phase(),
                Phase::S5 {
                    anchor: Position::new(3.0, 4.0, 0.0)
                }
            );
            assert_eq!(state(Phase::S8).next(cmd, &model).unwrap().id(), StateId::S7);
        }
    }

    #[test]
    fn test_continue_selects_distinct_terminal() {
        let model = FixedModel::at(0.0, 0.0, 0.0);
        let s7 = state(Phase::S7);

        let continued = s7.next(Some(Command::Continue), &model).unwrap();
        assert_eq!(continued.id(), StateId::S9);
        assert_eq!(continued.flags(), Flags::NONE);

        assert_eq!(s7.next(None, &model).unwrap().id(), StateId::S6);
        assert_eq!(s7.next(Some(Command::Abort), &model).unwrap().id(), StateId::S6);
    }

    #[test]
    fn test_terminal_states_are_idempotent() {
        let model = FixedModel::at(50.0, 50.0, 180.0);

        for terminal in [state(Phase::S6), state(Phase::S9)] {
            assert!(terminal.is_terminal());
            for cmd in COMMANDS {
                let next = terminal.next(cmd, &model).unwrap();
                assert_eq!(next, terminal);
                assert_eq!(next.velocity(), 0.0);
                assert_eq!(next.omega(), 0.0);
            }
        }
    }

    #[test]
    fn test_commanded_motion() {
        let expected = [
            (Phase::S1 { tick: 0 }, 0.0, 0.0),
            (
                Phase::S2 {
                    anchor: Position::default(),
                },
                1.0,
                0.0,
            ),
            (
                Phase::S3 {
                    anchor_heading: 0.0,
                },
                0.0,
                1.0,
            ),
            (Phase::S4, 0.0, 1.0),
            (
                Phase::S5 {
                    anchor: Position::default(),
                },
                1.0,
                0.0,
            ),
            (Phase::S6, 0.0, 0.0),
            (Phase::S7, 1.0, 0.0),
            (Phase::S8, 0.0, 1.0),
            (Phase::S9, 0.0, 0.0),
        ];

        for (phase, velocity, omega) in expected {
            let state = state(phase);
            assert_eq!(state.velocity(), velocity, "velocity of {}", phase.id());
            assert_eq!(state.omega(), omega, "omega of {}", phase.id());
        }
    }
}
