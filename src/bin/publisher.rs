use anyhow::{Result, anyhow, bail};
use moq_lite::{OriginConsumer, OriginProducer, Track};
use prost::Message;
use rover_ha::driver::{Driver, DriverConfig};
use rover_ha::messages::Start;
use rover_ha::transport::proto::RunReport;
use rover_ha::transport::{self, TransportConfig};
use rover_ha::vehicle_id::VehicleId;
use rover_ha::{RESULT_TRACK, connect_bidirectional, run_broadcast_path};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let url = std::env::var("RELAY_URL").unwrap_or_else(|_| "https://localhost:4443".to_string());
    let world = std::env::var("WORLD").unwrap_or_else(|_| "default".to_string());
    let vehicle = VehicleId::from(
        std::env::var("VEHICLE_NAME").unwrap_or_else(|_| "r1_rover".to_string()),
    );
    let frequency_hz = match std::env::var("FREQUENCY") {
        Ok(value) => value.parse::<f64>()?,
        Err(_) => 1.0,
    };
    let await_start = std::env::var("AWAIT_START")
        .map(|value| matches!(value.as_str(), "1" | "true"))
        .unwrap_or(false);

    info!(
        relay = %url,
        world = %world,
        vehicle = %vehicle,
        frequency_hz,
        await_start,
        "Publisher connecting to relay"
    );

    let (_session, producer, mut consumer) = connect_bidirectional(&url).await?;

    let run_path = run_broadcast_path(vehicle.as_str());
    let mut run_broadcast = producer
        .create_broadcast(&run_path)
        .ok_or_else(|| anyhow!("failed to create run broadcast at '{run_path}'"))?;
    let mut result_track = run_broadcast.create_track(Track::new(RESULT_TRACK));

    let transport_config = TransportConfig::builder()
        .world(world)
        .vehicle(vehicle.clone())
        .build();
    let driver_config = DriverConfig::builder()
        .frequency_hz(frequency_hz)
        .vehicle(vehicle)
        .build();

    let report = run(
        &producer,
        &mut consumer,
        &transport_config,
        driver_config,
        await_start,
    )
    .await;
    result_track.write_frame(report.encode_to_vec());

    if !report.is_success() {
        bail!("run failed: {}", report.error);
    }

    info!(
        run_id = %report.run_id,
        ticks = report.steps.len(),
        "Published run report"
    );

    Ok(())
}

/// Bring the rover online, run one maneuver and report the outcome, whatever it is.
async fn run(
    producer: &OriginProducer,
    consumer: &mut OriginConsumer,
    transport_config: &TransportConfig,
    driver_config: DriverConfig,
    await_start: bool,
) -> RunReport {
    let vehicle = transport_config.vehicle.clone();

    // The world is awaited first, its announcement must not be consumed while waiting for the
    // start request.
    let spawned = match transport::spawn(producer, consumer, transport_config).await {
        Ok(spawned) => spawned,
        Err(e) => {
            error!(vehicle = %vehicle, error = %e, "Failed to bring rover online");
            return RunReport::failure(&vehicle, "", &e, None);
        }
    };

    let start = if await_start {
        match transport::receive_start(consumer, transport_config).await {
            Ok(start) => start,
            Err(e) => {
                error!(vehicle = %vehicle, error = %e, "Failed to receive start request");
                spawned.remove();
                return RunReport::failure(&vehicle, "", &e, None);
            }
        }
    } else {
        debug!(vehicle = %vehicle, "No start request expected, running idle");
        Start::idle()
    };

    let driver = Driver::new(driver_config, spawned.rover.clone(), start);
    let run_id = driver.run_id();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    let outcome = driver.run_until(shutdown).await;
    spawned.remove();

    match outcome {
        Ok(result) => {
            for step in &result.history {
                debug!(
                    time = step.time,
                    x = step.position.x,
                    y = step.position.y,
                    z = step.position.z,
                    heading = step.heading,
                    roll = step.roll,
                    state = %step.state,
                    "Trace step"
                );
            }
            RunReport::new(&vehicle, run_id, &result)
        }
        Err(e) => {
            warn!(run_id = %run_id, error = %e, "Run failed");
            RunReport::failure(&vehicle, run_id, &e, e.trace())
        }
    }
}
