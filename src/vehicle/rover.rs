use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Model, Pose, PoseEstimator, Vehicle};
use crate::state_machine::StateMachine;
use crate::state_machine::actuation::{
    ActuationInput, ActuationMachine, ActuationOutput, MotorCommand,
};
use crate::vehicle_id::VehicleId;

/// Outbound motor command channel. Delivery is fire-and-forget.
pub trait ActuationSink: Send + Sync {
    fn publish(&self, command: MotorCommand);
}

/// Forwards motor commands to an in-process receiver.
#[derive(Debug, Clone)]
pub struct ChannelActuationSink(mpsc::UnboundedSender<MotorCommand>);

impl ChannelActuationSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MotorCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl ActuationSink for ChannelActuationSink {
    fn publish(&self, command: MotorCommand) {
        if self.0.send(command).is_err() {
            warn!(?command, "Actuation receiver dropped, discarding motor command");
        }
    }
}

/// A live vehicle: the pose fed from the world plus a debounced motor command channel.
pub struct Rover {
    vehicle_id: VehicleId,
    pose_estimator: Arc<PoseEstimator>,
    actuation_machine: Mutex<ActuationMachine>,
    // Taken before the machine lock and held while publishing, so commands leave in cache order.
    sink: Mutex<Box<dyn ActuationSink>>,
}

impl std::fmt::Debug for Rover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rover")
            .field("vehicle_id", &self.vehicle_id)
            .field("pose_estimator", &self.pose_estimator)
            .field("actuation_machine", &"<ActuationMachine>")
            .finish()
    }
}

impl Rover {
    pub fn new(vehicle_id: VehicleId, sink: impl ActuationSink + 'static) -> Self {
        let pose_estimator = Arc::new(PoseEstimator::new(vehicle_id.clone()));
        Self::with_estimator(vehicle_id, pose_estimator, sink)
    }

    /// Build a rover around an estimator that a feed is already writing into.
    pub fn with_estimator(
        vehicle_id: VehicleId,
        pose_estimator: Arc<PoseEstimator>,
        sink: impl ActuationSink + 'static,
    ) -> Self {
        Self {
            vehicle_id,
            pose_estimator,
            actuation_machine: Mutex::new(ActuationMachine::new()),
            sink: Mutex::new(Box::new(sink)),
        }
    }

    pub fn vehicle_id(&self) -> &VehicleId {
        &self.vehicle_id
    }

    pub fn pose_estimator(&self) -> &Arc<PoseEstimator> {
        &self.pose_estimator
    }

    fn actuate(&self, input: ActuationInput) {
        let sink = self.sink.lock().expect("actuation sink lock poisoned");
        let commands: Vec<MotorCommand> = {
            let mut machine = self
                .actuation_machine
                .lock()
                .expect("actuation machine lock poisoned");
            machine.process_input(input);
            std::iter::from_fn(|| machine.poll_output())
                .map(|ActuationOutput::Command(command)| command)
                .collect()
        };

        for command in commands {
            debug!(vehicle = %self.vehicle_id, wheels = ?command.wheels(), "Publishing motor command");
            sink.publish(command);
        }
    }
}

impl Model for Rover {
    fn pose(&self) -> Pose {
        self.pose_estimator.pose()
    }
}

impl Vehicle for Rover {
    fn velocity(&self) -> f64 {
        self.actuation_machine
            .lock()
            .expect("actuation machine lock poisoned")
            .velocity()
    }

    fn set_velocity(&self, target: f64) {
        self.actuate(ActuationInput::SetVelocity(target));
    }

    fn omega(&self) -> f64 {
        self.actuation_machine
            .lock()
            .expect("actuation machine lock poisoned")
            .omega()
    }

    fn set_omega(&self, target: f64) {
        self.actuate(ActuationInput::SetOmega(target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_velocity_publishes_once() {
        let (sink, mut rx) = ChannelActuationSink::new();
        let rover = Rover::new(VehicleId::from("r1_rover"), sink);

        rover.set_velocity(1.0);
        rover.set_velocity(1.0);

        assert_eq!(rx.try_recv().unwrap(), MotorCommand([-1.0, 1.0]));
        assert!(rx.try_recv().is_err());
        assert_eq!(rover.velocity(), 1.0);
    }

    #[test]
    fn test_differing_values_publish_twice() {
        let (sink, mut rx) = ChannelActuationSink::new();
        let rover = Rover::new(VehicleId::from("r1_rover"), sink);

        rover.set_omega(1.0);
        rover.set_omega(0.5);

        assert_eq!(rx.try_recv().unwrap(), MotorCommand([1.0, 1.0]));
        assert_eq!(rx.try_recv().unwrap(), MotorCommand([0.5, 0.5]));
        assert!(rx.try_recv().is_err());
        assert_eq!(rover.omega(), 0.5);
    }

    #[test]
    fn test_dropped_receiver_does_not_fail_actuation() {
        let (sink, rx) = ChannelActuationSink::new();
        drop(rx);
        let rover = Rover::new(VehicleId::from("r1_rover"), sink);

        rover.set_velocity(1.0);
        assert_eq!(rover.velocity(), 1.0);
    }

    #[test]
    fn test_concurrent_setters_publish_in_cache_order() {
        let (sink, mut rx) = ChannelActuationSink::new();
        let rover = Arc::new(Rover::new(VehicleId::from("r1_rover"), sink));

        let writers: Vec<_> = (1..=8)
            .map(|writer| {
                let rover = Arc::clone(&rover);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        rover.set_velocity(f64::from(writer * 1000 + i));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let mut last = None;
        while let Ok(command) = rx.try_recv() {
            last = Some(command);
        }
        assert_eq!(last, Some(MotorCommand::linear(rover.velocity())));
    }

    #[test]
    fn test_reads_come_from_estimator() {
        let (sink, _rx) = ChannelActuationSink::new();
        let rover = Rover::new(VehicleId::from("r1_rover"), sink);

        assert_eq!(rover.pose(), Pose::default());
        assert!(!rover.pose_estimator().has_observation());
    }
}
