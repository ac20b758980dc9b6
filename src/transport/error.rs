//! Error types for receiving a start request.

use thiserror::Error;

use crate::automaton::InvalidCommand;
use crate::vehicle_id::VehicleId;

/// Errors that keep a run from receiving its start request.
#[derive(Debug, Error)]
pub enum StartError {
    /// No start request arrived in time.
    #[error("timed out waiting for a start request for '{vehicle}'")]
    Timeout { vehicle: VehicleId },

    /// The control broadcast went away before a start request arrived.
    #[error("control broadcast for '{vehicle}' closed before a start request arrived")]
    Closed { vehicle: VehicleId },

    /// Failed to decode the start request.
    #[error("protobuf decode error")]
    Decode(#[from] prost::DecodeError),

    /// The start request carried a code outside the command alphabet.
    #[error("invalid start request")]
    Command(#[from] InvalidCommand),

    /// An error from the underlying MoQ transport.
    #[error("MoQ transport error")]
    Moq(#[from] moq_lite::Error),
}
