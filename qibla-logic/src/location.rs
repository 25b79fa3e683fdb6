use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// A "part" of a location
pub type LocationComponent = f64;

/// Coordinates of the Kaaba in Mecca, the default destination
pub const KAABA: GeoPoint = GeoPoint::new(21.4225, 39.8262);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Some location in the world as gotten from a Geolocation API or picked on a map
pub struct GeoPoint {
    /// Latitude, degrees in [-90, 90]
    pub lat: LocationComponent,
    /// Longitude, degrees in [-180, 180]
    pub long: LocationComponent,
}

impl GeoPoint {
    pub const fn new(lat: LocationComponent, long: LocationComponent) -> Self {
        Self { lat, long }
    }

    /// Whether both components are finite and inside their valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.long.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.long)
    }

    /// At the poles the longitude difference stops meaning anything, bearings computed from
    /// here are numerically degenerate.
    pub fn is_polar(&self) -> bool {
        self.lat.abs() == 90.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Where the session's current location came from
pub enum LocationSource {
    /// Automatic fix from the device's geolocation provider
    Device,
    /// The user picked a point on a map
    Manual,
    /// Acquisition failed, the configured fallback point is in use
    Fallback,
}

/// One-shot location acquisition, the session issues no retries of its own.
pub trait LocationService {
    fn get_loc(&self) -> impl Future<Output = Result<GeoPoint>> + Send;
}
