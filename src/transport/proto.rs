//! Wire messages exchanged with the simulator and the run orchestrator.
//!
//! Field layout follows the simulator's own pose and actuator messages so frames can be bridged
//! without re-encoding.

use std::error::Error;

use nalgebra as na;

use crate::attack::StationaryMagnet;
use crate::automaton::{Command, InvalidCommand};
use crate::driver::{Step, Trace};
use crate::messages::{RunResult, Start};
use crate::state_machine::actuation::MotorCommand;
use crate::state_machine::pose::{Observation, ObservationBatch};
use crate::vehicle::Position;
use crate::vehicle_id::VehicleId;

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Time {
    #[prost(int64, tag = "1")]
    pub sec: i64,
    #[prost(int32, tag = "2")]
    pub nsec: i32,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Header {
    #[prost(message, optional, tag = "1")]
    pub stamp: Option<Time>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Vector3d {
    #[prost(double, tag = "1")]
    pub x: f64,
    #[prost(double, tag = "2")]
    pub y: f64,
    #[prost(double, tag = "3")]
    pub z: f64,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Quaternion {
    #[prost(double, tag = "1")]
    pub x: f64,
    #[prost(double, tag = "2")]
    pub y: f64,
    #[prost(double, tag = "3")]
    pub z: f64,
    #[prost(double, tag = "4")]
    pub w: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Pose {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub position: Option<Vector3d>,
    #[prost(message, optional, tag = "3")]
    pub orientation: Option<Quaternion>,
}

/// Poses of every model in a world at one instant.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PoseV {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    #[prost(message, repeated, tag = "2")]
    pub pose: Vec<Pose>,
}

/// Wheel speeds for a model's motors.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Actuators {
    #[prost(double, repeated, tag = "1")]
    pub velocity: Vec<f64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StepRecord {
    #[prost(double, tag = "1")]
    pub time: f64,
    #[prost(double, tag = "2")]
    pub x: f64,
    #[prost(double, tag = "3")]
    pub y: f64,
    #[prost(double, tag = "4")]
    pub z: f64,
    #[prost(double, tag = "5")]
    pub heading: f64,
    #[prost(double, tag = "6")]
    pub roll: f64,
    #[prost(string, tag = "7")]
    pub state: String,
}

/// Command code for a tick without a command.
pub const NO_COMMAND: u32 = 0;

/// Request to run one maneuver, sent by the orchestrator.
#[derive(Clone, PartialEq, prost::Message)]
pub struct StartRequest {
    /// One code per tick, [`NO_COMMAND`] for a tick without one.
    #[prost(uint32, repeated, tag = "1")]
    pub commands: Vec<u32>,
    /// Offset of a stationary magnet, none when absent.
    #[prost(double, optional, tag = "2")]
    pub magnet: Option<f64>,
    /// Keep ticking without commands once `commands` runs out.
    #[prost(bool, tag = "3")]
    pub idle_after: bool,
}

/// The trace of a run, flattened for the analysis side.
///
/// A failed run carries a non-empty `error` and whatever steps were recorded before it failed.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RunReport {
    #[prost(string, tag = "1")]
    pub vehicle: String,
    #[prost(string, tag = "2")]
    pub run_id: String,
    #[prost(message, repeated, tag = "3")]
    pub steps: Vec<StepRecord>,
    #[prost(string, tag = "4")]
    pub error: String,
}

impl RunReport {
    pub fn new(vehicle: &VehicleId, run_id: impl ToString, result: &RunResult) -> Self {
        Self {
            vehicle: vehicle.to_string(),
            run_id: run_id.to_string(),
            steps: result.history.iter().map(StepRecord::from).collect(),
            error: String::new(),
        }
    }

    /// Report a run that failed with `error`, including its source chain.
    pub fn failure(
        vehicle: &VehicleId,
        run_id: impl ToString,
        error: &dyn Error,
        trace: Option<&Trace>,
    ) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        Self {
            vehicle: vehicle.to_string(),
            run_id: run_id.to_string(),
            steps: trace
                .map(|trace| trace.iter().map(StepRecord::from).collect())
                .unwrap_or_default(),
            error: message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

fn decode_command(code: u32) -> Result<Option<Command>, InvalidCommand> {
    if code == NO_COMMAND {
        return Ok(None);
    }

    let code = u8::try_from(code).map_err(|_| InvalidCommand { code })?;
    Command::try_from(code).map(Some)
}

impl TryFrom<StartRequest> for Start {
    type Error = InvalidCommand;

    fn try_from(request: StartRequest) -> Result<Self, Self::Error> {
        let commands = request
            .commands
            .into_iter()
            .map(decode_command)
            .collect::<Result<Vec<_>, _>>()?;

        let start = if request.idle_after {
            Start::new(commands.into_iter().chain(std::iter::repeat(None)))
        } else {
            Start::new(commands)
        };

        Ok(match request.magnet {
            Some(magnitude) => start.with_magnet(StationaryMagnet::new(magnitude)),
            None => start,
        })
    }
}

impl From<&Step> for StepRecord {
    fn from(step: &Step) -> Self {
        Self {
            time: step.time,
            x: step.position.x,
            y: step.position.y,
            z: step.position.z,
            heading: step.heading,
            roll: step.roll,
            state: step.state.id().to_string(),
        }
    }
}

impl From<MotorCommand> for Actuators {
    fn from(command: MotorCommand) -> Self {
        Self {
            velocity: command.wheels().to_vec(),
        }
    }
}

impl Time {
    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + f64::from(self.nsec) / 1e9
    }
}

impl From<Pose> for Observation {
    fn from(pose: Pose) -> Self {
        let position = pose.position.unwrap_or_default();
        // A missing orientation decodes as all zeros, which the pose machine reads as identity.
        let orientation = pose.orientation.unwrap_or_default();

        Self {
            name: pose.name,
            position: Position::new(position.x, position.y, position.z),
            orientation: na::Quaternion::new(
                orientation.w,
                orientation.x,
                orientation.y,
                orientation.z,
            ),
        }
    }
}

impl From<PoseV> for ObservationBatch {
    fn from(msg: PoseV) -> Self {
        let stamp = msg
            .header
            .and_then(|header| header.stamp)
            .map(|stamp| stamp.as_secs_f64())
            .unwrap_or_default();

        Self {
            stamp,
            observations: msg.pose.into_iter().map(Observation::from).collect(),
        }
    }
}
