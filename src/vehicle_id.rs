use std::fmt::Display;
use std::sync::Arc;

/// The name a vehicle model is registered under in the simulated world.
///
/// Pose batches from the world feed carry one entry per model and are matched against this name,
/// and the motor command track is published under it.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VehicleId(Arc<str>);

impl VehicleId {
    /// Create a new [`VehicleId`] from any type that can be converted into an `Arc<str>`.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VehicleId {
    fn default() -> Self {
        Self::from("r1_rover")
    }
}

impl Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for VehicleId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl From<&str> for VehicleId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl PartialEq<str> for VehicleId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}
