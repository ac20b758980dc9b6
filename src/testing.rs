//! Fixtures shared by the unit tests.

use std::sync::Arc;

use nalgebra::UnitQuaternion;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::state_machine::actuation::MotorCommand;
use crate::state_machine::pose::{Observation, ObservationBatch};
use crate::vehicle::{ChannelActuationSink, Position, Rover};
use crate::vehicle_id::VehicleId;

pub const ROVER: &str = "r1_rover";

/// A world batch holding only the test rover, level, at `(x, y, 0)` facing `heading` degrees.
pub fn batch(stamp: f64, x: f64, y: f64, heading: f64) -> ObservationBatch {
    let orientation = *UnitQuaternion::from_euler_angles(0.0, 0.0, heading.to_radians()).quaternion();

    ObservationBatch {
        stamp,
        observations: vec![Observation {
            name: ROVER.to_string(),
            position: Position::new(x, y, 0.0),
            orientation,
        }],
    }
}

/// A rover whose motor commands land in the returned receiver.
pub fn rover() -> (Arc<Rover>, UnboundedReceiver<MotorCommand>) {
    let (sink, rx) = ChannelActuationSink::new();
    (Arc::new(Rover::new(VehicleId::from(ROVER), sink)), rx)
}

/// Drain every motor command published so far.
pub fn drain(rx: &mut UnboundedReceiver<MotorCommand>) -> Vec<[f64; 2]> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .map(|command| command.wheels())
        .collect()
}
