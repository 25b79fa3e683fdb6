use serde::{Deserialize, Serialize};

use crate::heading::HeadingSample;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Outcome of asking the platform for orientation sensor access
pub enum PermissionStatus {
    Granted,
    /// The user refused access
    Denied,
    /// The device has no orientation sensor
    Unsupported,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum SensorEvent {
    /// A new raw reading
    Heading(HeadingSample),
    /// The sensor went away or never delivered usable readings
    Unsupported,
    /// Access was revoked by the user
    PermissionDenied,
    /// The source has no more events, consumers should stop listening. This is a success state.
    Closed,
}

impl From<HeadingSample> for SensorEvent {
    fn from(v: HeadingSample) -> Self {
        Self::Heading(v)
    }
}

/// A subscription to a device orientation sensor.
///
/// Events must be delivered in arrival order. The session processes each one to completion
/// before asking for more.
pub trait HeadingSource: Send + Sync {
    /// Ask for access to the sensor, platforms without a permission model just grant it.
    fn request_permission(&self) -> impl Future<Output = PermissionStatus> + Send {
        async { PermissionStatus::Granted }
    }
    /// Receive pending events, waits until at least one is available
    fn receive_events(&self) -> impl Future<Output = impl Iterator<Item = SensorEvent>>;
    /// Stop delivering events and release the sensor. Calling this more than once must be
    /// harmless.
    fn unsubscribe(&self) -> impl Future<Output = ()> {
        async {}
    }
}
