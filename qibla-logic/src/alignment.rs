use serde::{Deserialize, Serialize};

use crate::geo::wrap_180;

/// Signed turn from a device facing `heading` to `target_bearing`, in (-180, 180]. Positive
/// means the target is clockwise of the device.
pub fn relative_direction(target_bearing: f64, heading: f64) -> f64 {
    wrap_180(target_bearing - heading)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// How closely the device heading matches the target bearing
pub enum AlignmentState {
    Aligned,
    Near,
    Off,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Bucket edges for [AlignmentState], in degrees of absolute relative direction
pub struct AlignmentThresholds {
    /// Below this the device counts as aligned
    pub aligned: f64,
    /// Below this (and not aligned) the device counts as near
    pub near: f64,
}

impl Default for AlignmentThresholds {
    fn default() -> Self {
        Self {
            aligned: 5.0,
            near: 15.0,
        }
    }
}

impl AlignmentThresholds {
    /// Classify a signed relative direction in (-180, 180]
    pub fn classify(&self, relative_direction: f64) -> AlignmentState {
        let off_by = relative_direction.abs();
        if off_by < self.aligned {
            AlignmentState::Aligned
        } else if off_by < self.near {
            AlignmentState::Near
        } else {
            AlignmentState::Off
        }
    }

    /// Classify a signed relative direction and turn it into guidance
    pub fn assess(&self, relative_direction: f64) -> Orientation {
        let alignment = self.classify(relative_direction);
        Orientation {
            relative_direction,
            alignment,
            guidance: TurnGuidance::new(relative_direction, alignment),
        }
    }

    /// [Self::assess] for a device facing `heading` with the target at `target_bearing`
    pub fn orient(&self, target_bearing: f64, heading: f64) -> Orientation {
        self.assess(relative_direction(target_bearing, heading))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TurnDirection {
    /// Turn clockwise
    Right,
    /// Turn counter-clockwise
    Left,
    /// Already facing the target
    Hold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// A "turn left/right by N°" directive for the user
pub struct TurnGuidance {
    pub direction: TurnDirection,
    /// Always >= 0
    pub degrees: f64,
}

impl TurnGuidance {
    /// Positive relative directions mean the target is clockwise of the device
    pub fn new(relative_direction: f64, alignment: AlignmentState) -> Self {
        let direction = if alignment == AlignmentState::Aligned {
            TurnDirection::Hold
        } else if relative_direction > 0.0 {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        };

        Self {
            direction,
            degrees: relative_direction.abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Where a device heading stands relative to the target
pub struct Orientation {
    /// How far to rotate clockwise to face the target, (-180, 180]
    pub relative_direction: f64,
    pub alignment: AlignmentState,
    pub guidance: TurnGuidance,
}
