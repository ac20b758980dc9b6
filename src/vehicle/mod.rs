//! Vehicle abstractions shared between the automaton and the driver.
//!
//! The automaton only ever needs two narrow capabilities: reading where the vehicle is
//! ([`Model`]) and setting how it should move ([`Vehicle`]). [`Rover`] provides both on top of a
//! [`PoseEstimator`] and an [`ActuationSink`].

pub mod error;
pub mod pose_estimator;
pub mod rover;

use std::sync::Arc;

pub use self::pose_estimator::PoseEstimator;
pub use self::rover::{ActuationSink, ChannelActuationSink, Rover};

/// A point in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Position) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2) + (other.z - self.z).powi(2))
            .sqrt()
    }
}

impl From<(f64, f64, f64)> for Position {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

/// The most recently observed pose of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Position,
    /// Heading in degrees.
    pub heading: f64,
    /// Roll in radians.
    pub roll: f64,
    /// Simulation time of the observation in seconds.
    pub clock: f64,
}

/// Read-only access to the sampled state of a vehicle.
pub trait Model {
    /// Full pose sample, read in one critical section.
    fn pose(&self) -> Pose;

    fn position(&self) -> Position {
        self.pose().position
    }

    fn heading(&self) -> f64 {
        self.pose().heading
    }

    fn roll(&self) -> f64 {
        self.pose().roll
    }

    fn clock(&self) -> f64 {
        self.pose().clock
    }
}

/// A [`Model`] that can also be told how to move.
///
/// Setters take `&self`: the handle is shared between the automaton and the driver, and
/// implementors serialize writes internally. Outbound commands leave in the order the writes
/// were applied.
pub trait Vehicle: Model {
    fn velocity(&self) -> f64;

    fn set_velocity(&self, target: f64);

    fn omega(&self) -> f64;

    fn set_omega(&self, target: f64);
}

impl<T: Model + ?Sized> Model for Arc<T> {
    fn pose(&self) -> Pose {
        (**self).pose()
    }

    fn position(&self) -> Position {
        (**self).position()
    }

    fn heading(&self) -> f64 {
        (**self).heading()
    }

    fn roll(&self) -> f64 {
        (**self).roll()
    }

    fn clock(&self) -> f64 {
        (**self).clock()
    }
}

impl<T: Vehicle + ?Sized> Vehicle for Arc<T> {
    fn velocity(&self) -> f64 {
        (**self).velocity()
    }

    fn set_velocity(&self, target: f64) {
        (**self).set_velocity(target)
    }

    fn omega(&self) -> f64 {
        (**self).omega()
    }

    fn set_omega(&self, target: f64) {
        (**self).set_omega(target)
    }
}
