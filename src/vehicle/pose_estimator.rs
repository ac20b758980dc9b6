use std::sync::Mutex;

use tracing::debug;

use super::{Model, Pose};
use crate::state_machine::StateMachine;
use crate::state_machine::pose::{ObservationBatch, PoseInput, PoseMachine, PoseOutput};
use crate::vehicle_id::VehicleId;

/// Thread-safe holder of the latest pose of one vehicle.
///
/// The asynchronous feed writes through [`observe`](Self::observe) while the driver and the
/// automaton read; all of them go through a single lock that is held only long enough to update
/// or copy the pose, so the four pose fields always change together.
pub struct PoseEstimator {
    pose_machine: Mutex<PoseMachine>,
}

impl std::fmt::Debug for PoseEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseEstimator")
            .field("pose_machine", &"<PoseMachine>")
            .finish()
    }
}

impl PoseEstimator {
    pub fn new(vehicle_id: VehicleId) -> Self {
        Self {
            pose_machine: Mutex::new(PoseMachine::new(vehicle_id)),
        }
    }

    /// Feed a world pose batch. Batches that do not mention this vehicle leave the pose untouched.
    pub fn observe(&self, batch: ObservationBatch) {
        let mut machine = self
            .pose_machine
            .lock()
            .expect("pose machine lock poisoned");
        machine.process_input(PoseInput::Batch(batch));

        if machine.has_pending() {
            debug!(vehicle = %machine.vehicle_id(), pose = ?machine.current_pose(), "Received pose");
        }
    }

    /// Whether at least one pose for this vehicle has arrived.
    pub fn has_observation(&self) -> bool {
        self.pose_machine
            .lock()
            .expect("pose machine lock poisoned")
            .current_pose()
            .is_some()
    }

    /// Returns the pose if one arrived since the last call.
    pub fn take_fresh(&self) -> Option<Pose> {
        let mut machine = self
            .pose_machine
            .lock()
            .expect("pose machine lock poisoned");
        machine.poll_output().map(|out| match out {
            PoseOutput::PoseUpdate(pose) => pose,
        })
    }
}

impl Model for PoseEstimator {
    /// The latest pose, or the zeroed default before the first observation.
    fn pose(&self) -> Pose {
        self.pose_machine
            .lock()
            .expect("pose machine lock poisoned")
            .current_pose()
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nalgebra::Quaternion;

    use super::*;
    use crate::state_machine::pose::Observation;
    use crate::vehicle::Position;

    fn batch(stamp: f64, x: f64) -> ObservationBatch {
        ObservationBatch {
            stamp,
            observations: vec![Observation {
                name: "r1_rover".to_string(),
                position: Position::new(x, -x, 0.0),
                orientation: Quaternion::identity(),
            }],
        }
    }

    #[test]
    fn test_default_before_first_observation() {
        let estimator = PoseEstimator::new(VehicleId::from("r1_rover"));

        assert!(!estimator.has_observation());
        assert_eq!(estimator.pose(), Pose::default());
        assert!(estimator.take_fresh().is_none());
    }

    #[test]
    fn test_fresh_pose_is_taken_once() {
        let estimator = PoseEstimator::new(VehicleId::from("r1_rover"));

        estimator.observe(batch(1.0, 2.0));

        assert!(estimator.has_observation());
        assert_eq!(estimator.position(), Position::new(2.0, -2.0, 0.0));
        assert_eq!(estimator.clock(), 1.0);
        assert!(estimator.take_fresh().is_some());
        assert!(estimator.take_fresh().is_none());
    }

    #[test]
    fn test_concurrent_writer_never_tears_pose() {
        let estimator = Arc::new(PoseEstimator::new(VehicleId::from("r1_rover")));

        let writer = {
            let estimator = Arc::clone(&estimator);
            std::thread::spawn(move || {
                for i in 1..=1000 {
                    let value = f64::from(i);
                    estimator.observe(batch(value, value));
                }
            })
        };

        for _ in 0..1000 {
            let pose = estimator.pose();
            // Every field of a sample comes from the same batch.
            assert_eq!(pose.position.x, pose.clock);
            assert_eq!(pose.position.y, -pose.clock);
        }

        writer.join().unwrap();
        assert_eq!(estimator.clock(), 1000.0);
    }
}
