//! Injected sensor disturbances.
//!
//! A [`Magnet`] models a magnetic field near the compass that skews readings by an offset which may
//! vary over time. Runs carry one through to the driver so that perturbed guard evaluation can be
//! added without touching the automaton's interface; no guard reads it yet.

/// A source of sensor offset as a function of simulation time in seconds.
pub trait Magnet: Send {
    fn offset(&self, time: f64) -> f64;
}

/// A magnet that never moves, producing the same offset at every instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StationaryMagnet {
    magnitude: f64,
}

impl StationaryMagnet {
    pub fn new(magnitude: f64) -> Self {
        Self { magnitude }
    }
}

impl Magnet for StationaryMagnet {
    fn offset(&self, _time: f64) -> f64 {
        self.magnitude
    }
}

/// Any `Fn(time) -> offset` closure is a magnet, e.g. for intermittent faults.
impl<F> Magnet for F
where
    F: Fn(f64) -> f64 + Send,
{
    fn offset(&self, time: f64) -> f64 {
        self(time)
    }
}
