//! Bridges a [`Rover`] to the simulator over MoQ.
//!
//! The world publishes pose batches at `world/{world}` on the [`POSE_TRACK`], the rover publishes
//! wheel speeds at `model/{name}` on the [`MOTOR_TRACK`]. Both carry [`proto`] messages, one per
//! frame. An orchestrator may hand the rover a [`StartRequest`] at `control/{name}` on the
//! [`START_TRACK`].

pub mod error;
pub mod proto;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bon::Builder;
use futures::{Stream, StreamExt};
use moq_lite::{
    BroadcastConsumer, BroadcastProducer, OriginConsumer, OriginProducer, Track, TrackProducer,
};
use prost::Message;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use self::error::StartError;
use self::proto::{Actuators, PoseV, StartRequest};
use crate::messages::Start;
use crate::state_machine::actuation::MotorCommand;
use crate::vehicle::error::ProvisioningError;
use crate::vehicle::{ActuationSink, PoseEstimator, Rover};
use crate::vehicle_id::VehicleId;
use crate::{
    MOTOR_TRACK, POSE_TRACK, START_TRACK, control_broadcast_path, model_broadcast_path,
    world_broadcast_path,
};

/// Configuration for bringing a rover online.
#[derive(Debug, Clone, Builder)]
pub struct TransportConfig {
    /// World the rover lives in.
    #[builder(default = "default".to_string())]
    pub world: String,

    /// Model name of the rover in that world.
    #[builder(default)]
    pub vehicle: VehicleId,

    /// Timeout for waiting for the world's pose broadcast.
    #[builder(default = Duration::from_secs(10))]
    pub timeout: Duration,

    /// Timeout for waiting for the orchestrator's start request.
    #[builder(default = Duration::from_secs(60))]
    pub start_timeout: Duration,
}

struct MotorTrack {
    // Keeps the model broadcast announced for as long as the sink lives.
    _broadcast: BroadcastProducer,
    track: TrackProducer,
}

/// Publishes motor commands as [`Actuators`] frames on a model's motor track.
pub struct TrackActuationSink {
    vehicle: VehicleId,
    motor_track: Mutex<MotorTrack>,
}

impl TrackActuationSink {
    /// Announce the model broadcast for `vehicle` and create its motor track.
    pub fn create(producer: &OriginProducer, vehicle: &VehicleId) -> Result<Self, ProvisioningError> {
        let path = model_broadcast_path(vehicle.as_str());
        let mut broadcast = producer.create_broadcast(&path).ok_or_else(|| {
            ProvisioningError::Publisher {
                vehicle: vehicle.clone(),
            }
        })?;
        let track = broadcast.create_track(Track::new(MOTOR_TRACK));

        debug!(vehicle = %vehicle, path = %path, "Created motor track publisher");

        Ok(Self {
            vehicle: vehicle.clone(),
            motor_track: Mutex::new(MotorTrack {
                _broadcast: broadcast,
                track,
            }),
        })
    }
}

impl ActuationSink for TrackActuationSink {
    fn publish(&self, command: MotorCommand) {
        let frame = Actuators::from(command).encode_to_vec();

        match self.motor_track.lock() {
            Ok(mut motor_track) => motor_track.track.write_frame(frame),
            Err(_) => warn!(vehicle = %self.vehicle, "Motor track lock poisoned, dropping command"),
        }
    }
}

/// A rover bound to a world, with its pose feed running in the background.
pub struct SpawnedRover {
    pub rover: Arc<Rover>,
    pose_feed: JoinHandle<()>,
}

impl SpawnedRover {
    /// Stop the pose feed. The motor broadcast goes away once the last rover handle is dropped.
    pub fn remove(self) {
        self.pose_feed.abort();
        info!(vehicle = %self.rover.vehicle_id(), "Removed rover");
    }
}

/// Bring a rover online: register its motor track, wait for the world's pose broadcast and start
/// feeding poses into the rover's estimator.
pub async fn spawn(
    producer: &OriginProducer,
    consumer: &mut OriginConsumer,
    config: &TransportConfig,
) -> Result<SpawnedRover, ProvisioningError> {
    let sink = TrackActuationSink::create(producer, &config.vehicle)?;
    let world = wait_for_world(consumer, config).await?;

    let rover = Arc::new(Rover::new(config.vehicle.clone(), sink));
    let pose_feed = tokio::spawn(run_pose_feed(
        config.world.clone(),
        world,
        Arc::clone(rover.pose_estimator()),
    ));

    info!(vehicle = %config.vehicle, world = %config.world, "Rover online");

    Ok(SpawnedRover { rover, pose_feed })
}

async fn wait_for_world(
    consumer: &mut OriginConsumer,
    config: &TransportConfig,
) -> Result<BroadcastConsumer, ProvisioningError> {
    let world_path = world_broadcast_path(&config.world);

    debug!(
        path = %world_path,
        timeout_secs = %config.timeout.as_secs(),
        "Waiting for world pose broadcast"
    );

    let world = tokio::time::timeout(config.timeout, wait_for_broadcast(consumer, &world_path))
        .await
        .map_err(|_| ProvisioningError::Timeout {
            world: config.world.clone(),
        })?;

    world.ok_or_else(|| ProvisioningError::PoseFeed {
        world: config.world.clone(),
    })
}

/// Wait until `path` is announced. `None` if it is unannounced first or the origin closes.
async fn wait_for_broadcast(consumer: &mut OriginConsumer, path: &str) -> Option<BroadcastConsumer> {
    while let Some((announced, broadcast)) = consumer.announced().await {
        if announced.as_str() == path {
            return broadcast;
        }
    }

    None
}

/// Wait for the orchestrator's start request for the configured vehicle.
///
/// Only the first frame on the start track is read; a run takes exactly one request.
pub async fn receive_start(
    consumer: &mut OriginConsumer,
    config: &TransportConfig,
) -> Result<Start, StartError> {
    let path = control_broadcast_path(config.vehicle.as_str());
    let closed = || StartError::Closed {
        vehicle: config.vehicle.clone(),
    };

    debug!(
        path = %path,
        timeout_secs = %config.start_timeout.as_secs(),
        "Waiting for start request"
    );

    let receive = async {
        let control = wait_for_broadcast(consumer, &path).await.ok_or_else(closed)?;
        let mut track = control.subscribe_track(&Track::new(START_TRACK));
        let mut group = track.next_group().await?.ok_or_else(closed)?;
        let frame = group.read_frame().await?.ok_or_else(closed)?;
        Ok::<_, StartError>(StartRequest::decode(frame.as_ref())?)
    };

    let request = tokio::time::timeout(config.start_timeout, receive)
        .await
        .map_err(|_| StartError::Timeout {
            vehicle: config.vehicle.clone(),
        })??;

    info!(
        vehicle = %config.vehicle,
        commands = request.commands.len(),
        magnet = ?request.magnet,
        idle_after = request.idle_after,
        "Received start request"
    );

    Ok(Start::try_from(request)?)
}

/// Decoded pose batches from a world broadcast, ending when the track closes.
fn pose_batches(world: String, broadcast: BroadcastConsumer) -> impl Stream<Item = PoseV> {
    let mut track = broadcast.subscribe_track(&Track::new(POSE_TRACK));

    async_stream::stream! {
        loop {
            match track.next_group().await {
                Ok(Some(mut group)) => {
                    while let Ok(Some(frame)) = group.read_frame().await {
                        match PoseV::decode(frame.as_ref()) {
                            Ok(batch) => yield batch,
                            Err(e) => warn!(world = %world, error = %e, "Failed to decode pose batch"),
                        }
                    }
                }
                Ok(None) => {
                    info!(world = %world, "Pose track closed");
                    break;
                }
                Err(e) => {
                    warn!(world = %world, error = %e, "Pose track error");
                    break;
                }
            }
        }
    }
}

async fn run_pose_feed(world: String, broadcast: BroadcastConsumer, estimator: Arc<PoseEstimator>) {
    let batches = pose_batches(world, broadcast);
    futures::pin_mut!(batches);

    while let Some(batch) = batches.next().await {
        estimator.observe(batch.into());
    }
}
