//! Great-circle bearing and distance between two points on a spherical earth.
//!
//! Everything here is pure, safe to call from any thread without synchronization.

use serde::{Deserialize, Serialize};

use crate::location::GeoPoint;

/// Mean earth radius used by the haversine distance
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Normalize an angle in degrees into [0, 360)
pub fn wrap_360(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Normalize an angle in degrees into (-180, 180]
pub fn wrap_180(degrees: f64) -> f64 {
    let wrapped = wrap_360(degrees);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Initial great-circle bearing from `source` to `destination`, degrees clockwise from true
/// north in [0, 360).
///
/// Sources on a pole give a bearing, but the longitude difference is meaningless there so the
/// value says little about which way to face.
pub fn compute_bearing(source: GeoPoint, destination: GeoPoint) -> f64 {
    let lat_source = source.lat.to_radians();
    let lat_dest = destination.lat.to_radians();
    let delta_long = (destination.long - source.long).to_radians();

    let x = delta_long.sin() * lat_dest.cos();
    let y =
        lat_source.cos() * lat_dest.sin() - lat_source.sin() * lat_dest.cos() * delta_long.cos();

    wrap_360(x.atan2(y).to_degrees())
}

/// Great-circle distance in kilometres via the haversine formula
pub fn compute_distance_km(source: GeoPoint, destination: GeoPoint) -> f64 {
    let lat_source = source.lat.to_radians();
    let lat_dest = destination.lat.to_radians();
    let delta_lat = (destination.lat - source.lat).to_radians();
    let delta_long = (destination.long - source.long).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat_source.cos() * lat_dest.cos() * (delta_long / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points
    let a = a.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Bearing and distance from one point to another
pub struct BearingResult {
    /// Initial bearing, [0, 360)
    pub bearing_degrees: f64,
    /// Great-circle distance, >= 0
    pub distance_km: f64,
}

/// Compute both the bearing and the distance from `source` to `destination`
pub fn compute(source: GeoPoint, destination: GeoPoint) -> BearingResult {
    BearingResult {
        bearing_degrees: compute_bearing(source, destination),
        distance_km: compute_distance_km(source, destination),
    }
}
