use nalgebra::{Quaternion, UnitQuaternion};
use tracing::warn;

use super::StateMachine;
use crate::vehicle::{Pose, Position};
use crate::vehicle_id::VehicleId;

/// A single named pose taken from a world pose batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: String,
    pub position: Position,
    pub orientation: Quaternion<f64>,
}

/// All model poses the world reported at one simulation instant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationBatch {
    /// Simulation time of the batch in seconds.
    pub stamp: f64,
    pub observations: Vec<Observation>,
}

/// Keeps the latest pose of one vehicle out of the batches it is fed.
#[derive(Debug)]
pub struct PoseMachine {
    vehicle_id: VehicleId,
    latest_pose: Option<Pose>,
    pending: bool,
}

impl PoseMachine {
    pub fn new(vehicle_id: VehicleId) -> Self {
        Self {
            vehicle_id,
            latest_pose: None,
            pending: false,
        }
    }

    pub fn vehicle_id(&self) -> &VehicleId {
        &self.vehicle_id
    }

    pub fn current_pose(&self) -> Option<&Pose> {
        self.latest_pose.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    fn update_pose(&mut self, batch: ObservationBatch) {
        let Some(observation) = batch
            .observations
            .into_iter()
            .find(|observation| self.vehicle_id == *observation.name)
        else {
            return;
        };

        // The clock never runs backwards, a late batch would roll the pose back.
        if let Some(latest) = &self.latest_pose
            && batch.stamp < latest.clock
        {
            warn!(
                vehicle = %self.vehicle_id,
                held = latest.clock,
                stamp = batch.stamp,
                "Dropping pose batch older than the held pose"
            );
            return;
        }

        let (_, pitch, yaw) = euler_angles(observation.orientation);

        // The trace's roll channel carries the rotation about the body y axis, which is the
        // tip-over axis of the rover model.
        self.latest_pose = Some(Pose {
            position: observation.position,
            heading: yaw.to_degrees(),
            roll: pitch,
            clock: batch.stamp,
        });
        self.pending = true;
    }

    fn poll_pose(&mut self) -> Option<Pose> {
        if self.pending {
            self.pending = false;
            self.latest_pose
        } else {
            None
        }
    }
}

/// Returns `(roll, pitch, yaw)` in radians. A degenerate all-zero quaternion, as sent by a feed
/// that leaves the orientation unset, is read as the identity rotation.
fn euler_angles(orientation: Quaternion<f64>) -> (f64, f64, f64) {
    UnitQuaternion::try_new(orientation, f64::EPSILON)
        .unwrap_or_else(UnitQuaternion::identity)
        .euler_angles()
}

pub enum PoseInput {
    Batch(ObservationBatch),
}

pub enum PoseOutput {
    PoseUpdate(Pose),
}

impl StateMachine for PoseMachine {
    type Input = PoseInput;
    type Output = PoseOutput;

    fn process_input(&mut self, input: Self::Input) {
        match input {
            PoseInput::Batch(batch) => self.update_pose(batch),
        }
    }

    fn poll_output(&mut self) -> Option<Self::Output> {
        self.poll_pose().map(PoseOutput::PoseUpdate)
    }
}
