use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::{
    alignment::AlignmentThresholds,
    heading::DEFAULT_SMOOTHING_FACTOR,
    location::{GeoPoint, KAABA},
    prelude::*,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Tuning for a Qibla session, any field left out of a settings file keeps its default
pub struct QiblaSettings {
    /// The fixed point the compass points towards
    pub destination: GeoPoint,
    /// Location used when the device can't provide one
    pub fallback_location: GeoPoint,
    /// Weight of each new heading sample, in (0, 1]. Higher is more responsive but jittery.
    pub smoothing_factor: f64,
    /// Number of raw heading samples kept for spread estimates
    pub buffer_size: u32,
    /// Bucket edges for the alignment classification
    pub thresholds: AlignmentThresholds,
    /// Spread of the raw sample window above which the compass should be recalibrated
    pub calibration_spread_degrees: f64,
}

impl Default for QiblaSettings {
    fn default() -> Self {
        Self {
            destination: KAABA,
            // Royal Observatory, Greenwich
            fallback_location: GeoPoint::new(51.4769, 0.0),
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            buffer_size: 5,
            thresholds: AlignmentThresholds::default(),
            calibration_spread_degrees: 45.0,
        }
    }
}

impl QiblaSettings {
    /// Check every field is inside its allowed range
    pub fn validate(&self) -> Result {
        if !self.destination.is_valid() {
            bail!("Destination {:?} is not a valid location", self.destination);
        }
        if !self.fallback_location.is_valid() {
            bail!(
                "Fallback location {:?} is not a valid location",
                self.fallback_location
            );
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            bail!(
                "Smoothing factor must be in (0, 1], got {}",
                self.smoothing_factor
            );
        }
        if self.buffer_size == 0 {
            bail!("Buffer size must be at least 1");
        }
        let AlignmentThresholds { aligned, near } = self.thresholds;
        if !(aligned > 0.0 && aligned.is_finite()) {
            bail!("Aligned threshold must be positive, got {aligned}");
        }
        if !(near > aligned && near.is_finite()) {
            bail!("Near threshold ({near}) must be larger than the aligned threshold ({aligned})");
        }
        if !(self.calibration_spread_degrees > 0.0) {
            bail!(
                "Calibration spread must be positive, got {}",
                self.calibration_spread_degrees
            );
        }
        Ok(())
    }
}
