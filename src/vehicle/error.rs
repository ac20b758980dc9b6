//! Error types for bringing a vehicle online.

use thiserror::Error;

use crate::vehicle_id::VehicleId;

/// Indicates that a live vehicle could not be provided for a run.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// The motor command track could not be registered.
    #[error("could not register motor command publisher for {vehicle}")]
    Publisher { vehicle: VehicleId },

    /// The world never announced its pose broadcast.
    #[error("pose feed for world '{world}' is unavailable")]
    PoseFeed { world: String },

    /// Timed out waiting for the world pose broadcast.
    #[error("timed out waiting for pose feed of world '{world}'")]
    Timeout { world: String },
}
