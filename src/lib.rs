pub mod attack;
pub mod automaton;
pub mod driver;
pub mod messages;
pub mod state_machine;
pub mod transport;
pub mod vehicle;
pub mod vehicle_id;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use moq_lite::{Client, Origin, Session};
use url::Url;
use web_transport_quinn::ClientBuilder;

/// Broadcast path for a world's model poses.
/// Published by the simulator, subscribed to by the rover.
pub fn world_broadcast_path(world: &str) -> String {
    format!("world/{world}")
}

/// Broadcast path for a model's motor commands.
/// Published by the rover, subscribed to by the simulator.
pub fn model_broadcast_path(vehicle: &str) -> String {
    format!("model/{vehicle}")
}

/// Broadcast path for the report of a finished run.
/// Published by the rover, subscribed to by the orchestrator.
pub fn run_broadcast_path(vehicle: &str) -> String {
    format!("run/{vehicle}")
}

/// Broadcast path for the start requests of a model's runs.
/// Published by the orchestrator, subscribed to by the rover.
pub fn control_broadcast_path(vehicle: &str) -> String {
    format!("control/{vehicle}")
}

pub const POSE_TRACK: &str = "pose";
pub const MOTOR_TRACK: &str = "motor_speed";
pub const RESULT_TRACK: &str = "result";
pub const START_TRACK: &str = "start";

/// Connect to the relay as a publisher + subscriber (bidirectional).
/// Returns the session handle and the origin producer/consumer pair.
pub async fn connect_bidirectional(
    relay_url: &str,
) -> Result<(Session, moq_lite::OriginProducer, moq_lite::OriginConsumer)> {
    let pub_origin = Origin::produce();
    let sub_origin = Origin::produce();

    let wt_client = ClientBuilder::new()
        .dangerous()
        .with_no_certificate_verification()?;
    let wt_session = wt_client.connect(relay_url.parse::<Url>()?).await?;

    let client = Client::new()
        .with_publish(pub_origin.consumer)
        .with_consume(sub_origin.producer);
    let session = client.connect(wt_session).await?;

    Ok((session, pub_origin.producer, sub_origin.consumer))
}
