//! Periodic stepping of the automaton against a live vehicle.

pub mod error;
mod trace;

use std::future::Future;
use std::time::Duration;

use bon::Builder;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

pub use self::error::RunError;
pub use self::trace::{Step, Trace};
use crate::attack::{Magnet, StationaryMagnet};
use crate::automaton::Automaton;
use crate::messages::{CommandStream, RunResult, Start};
use crate::vehicle::Vehicle;
use crate::vehicle_id::VehicleId;

/// Configuration for a [`Driver`].
#[derive(Debug, Clone, Builder)]
pub struct DriverConfig {
    /// Ticks per second.
    #[builder(default = 1.0)]
    pub frequency_hz: f64,

    /// Name of the driven vehicle, used to tag the run's logs.
    #[builder(default)]
    pub vehicle: VehicleId,
}

impl DriverConfig {
    /// The time between two ticks.
    pub fn period(&self) -> Result<Duration, RunError> {
        let invalid = || RunError::InvalidFrequency(self.frequency_hz);

        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            return Err(invalid());
        }

        let period = Duration::try_from_secs_f64(self.frequency_hz.recip()).map_err(|_| invalid())?;
        if period.is_zero() {
            return Err(invalid());
        }

        Ok(period)
    }
}

/// What a tick left the run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The automaton stepped and needs another tick.
    Continue,
    /// The automaton sits in a terminal state, nothing was stepped.
    Terminal,
}

/// Runs one maneuver: each tick records a [`Step`] and advances the automaton by one command.
pub struct Driver<V> {
    config: DriverConfig,
    run_id: Uuid,
    automaton: Automaton<V>,
    commands: CommandStream,
    magnet: Box<dyn Magnet>,
    trace: Trace,
}

impl<V: Vehicle> Driver<V> {
    pub fn new(config: DriverConfig, vehicle: V, start: Start) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
            automaton: Automaton::new(vehicle),
            commands: start.commands,
            magnet: start
                .magnet
                .unwrap_or_else(|| Box::new(StationaryMagnet::new(0.0))),
            trace: Trace::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn automaton(&self) -> &Automaton<V> {
        &self.automaton
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// The disturbance this run was started with.
    pub fn disturbance(&self) -> &dyn Magnet {
        self.magnet.as_ref()
    }

    /// Execute one read-evaluate-act cycle.
    ///
    /// On error the recorded trace moves into the error and the driver should be dropped.
    pub fn tick(&mut self) -> Result<Tick, RunError> {
        let pose = self.automaton.vehicle().pose();
        let state = *self.automaton.state();

        if self.trace.last().is_some_and(|last| last.time == pose.clock) {
            debug!(clock = pose.clock, "No new pose since last tick");
        }

        self.trace.push(Step {
            time: pose.clock,
            position: pose.position,
            heading: pose.heading,
            roll: pose.roll,
            state,
        });

        if state.is_terminal() {
            return Ok(Tick::Terminal);
        }

        let Some(cmd) = self.commands.next() else {
            return Err(RunError::CommandsExhausted {
                trace: std::mem::take(&mut self.trace),
            });
        };

        match self.automaton.step(cmd) {
            Ok(()) => Ok(Tick::Continue),
            Err(violation) => Err(RunError::Invariant {
                violation,
                trace: std::mem::take(&mut self.trace),
            }),
        }
    }

    /// Tick at the configured frequency until a terminal state is reached.
    pub async fn run(self) -> Result<RunResult, RunError> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but also stop at the first tick boundary after `shutdown`
    /// resolves.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<RunResult, RunError>
    where
        F: Future<Output = ()>,
    {
        let period = self.config.period()?;
        let span = info_span!("run", run_id = %self.run_id, vehicle = %self.config.vehicle);

        async move {
            info!(
                frequency_hz = self.config.frequency_hz,
                disturbance = self.magnet.offset(0.0),
                "Starting maneuver"
            );

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    biased;

                    _ = &mut shutdown => {
                        info!(ticks = self.trace.len(), "Shutdown requested, stopping");
                        return Err(RunError::Cancelled { trace: self.trace });
                    }

                    _ = ticker.tick() => {}
                }

                let last_state = *self.automaton.state();
                match self.tick()? {
                    Tick::Continue => debug!(
                        from = %last_state,
                        to = %self.automaton.state(),
                        "Stepping controller"
                    ),
                    Tick::Terminal => {
                        info!(
                            state = %last_state.id(),
                            ticks = self.trace.len(),
                            "Found terminal state, stopping"
                        );
                        return Ok(RunResult {
                            history: self.trace,
                        });
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}
