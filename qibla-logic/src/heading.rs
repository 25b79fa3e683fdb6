//! Compass heading smoothing
//!
//! Device orientation sensors report noisy headings at a high, irregular rate. The smoother
//! runs an angle-aware exponential moving average over them so a needle can be animated
//! without jitter, and keeps a short trailing window of raw samples for spread estimates.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    geo::{wrap_180, wrap_360},
    settings::QiblaSettings,
};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

/// Smoothing factor used when none (or a nonsensical one) is configured
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 0.25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// One raw compass reading
pub struct HeadingSample {
    /// Heading in degrees clockwise from north
    pub raw_degrees: f64,
    /// When the reading was taken
    pub timestamp: UtcDT,
}

impl HeadingSample {
    /// A reading taken now
    pub fn new(raw_degrees: f64) -> Self {
        Self::at(raw_degrees, Utc::now())
    }

    pub fn at(raw_degrees: f64, timestamp: UtcDT) -> Self {
        Self {
            raw_degrees,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
/// Output of [HeadingSmoother], always in [0, 360)
pub struct SmoothedHeading {
    pub degrees: f64,
}

/// Exponential moving average filter for heading values.
///
/// Differences are taken along the shortest arc, so a stream hovering around north
/// (359°, 1°, 359°, ...) settles near 0° rather than averaging out to 180°.
///
/// # Configuration
/// - `alpha = 1.0`: no filtering (pass-through)
/// - `alpha = 0.25`: moderate smoothing (default)
/// - `alpha = 0.0`: holds the first heading indefinitely
pub struct HeadingSmoother {
    alpha: f64,
    capacity: usize,
    history: VecDeque<HeadingSample>,
    smoothed: Option<f64>,
}

impl HeadingSmoother {
    /// Create a smoother with the given smoothing factor and trailing window size.
    ///
    /// Alpha is clamped to [0.0, 1.0] and a non-finite alpha falls back to
    /// [DEFAULT_SMOOTHING_FACTOR]. The window holds at least one sample.
    pub fn new(alpha: f64, buffer_size: usize) -> Self {
        let alpha = if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            warn!("Smoothing factor {alpha} is not a number, using {DEFAULT_SMOOTHING_FACTOR}");
            DEFAULT_SMOOTHING_FACTOR
        };
        let capacity = buffer_size.max(1);
        Self {
            alpha,
            capacity,
            history: VecDeque::with_capacity(capacity),
            smoothed: None,
        }
    }

    pub fn from_settings(settings: &QiblaSettings) -> Self {
        Self::new(settings.smoothing_factor, settings.buffer_size as usize)
    }

    /// Feed a raw sample and get the updated smoothed heading.
    ///
    /// The first sample after construction or [Self::reset] is returned unchanged.
    pub fn ingest(&mut self, sample: HeadingSample) -> SmoothedHeading {
        let raw = wrap_360(sample.raw_degrees);

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(HeadingSample::at(raw, sample.timestamp));

        let smoothed = match self.smoothed {
            None => raw,
            Some(prev) => wrap_360(prev + self.alpha * wrap_180(raw - prev)),
        };
        self.smoothed = Some(smoothed);

        SmoothedHeading { degrees: smoothed }
    }

    /// The current smoothed heading, `None` until the first sample
    pub fn current(&self) -> Option<SmoothedHeading> {
        self.smoothed.map(|degrees| SmoothedHeading { degrees })
    }

    /// Buffered raw samples, oldest first, normalized to [0, 360)
    pub fn history(&self) -> impl Iterator<Item = &HeadingSample> {
        self.history.iter()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.history.len() == self.capacity
    }

    /// Circular mean of the buffered raw samples.
    ///
    /// `None` when the window is empty or the samples cancel out (e.g. 0° and 180°).
    pub fn circular_mean(&self) -> Option<f64> {
        let (sin, cos) = self.history.iter().fold((0.0, 0.0), |(s, c), sample| {
            let rad = sample.raw_degrees.to_radians();
            (s + rad.sin(), c + rad.cos())
        });

        if self.history.is_empty() || sin.hypot(cos) < 1e-9 * self.history.len() as f64 {
            None
        } else {
            Some(wrap_360(sin.atan2(cos).to_degrees()))
        }
    }

    /// Largest shortest-arc deviation of a buffered sample from the circular mean, in degrees.
    ///
    /// Samples with no defined mean are as spread as they can get, 180°.
    pub fn spread(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }

        let Some(mean) = self.circular_mean() else {
            return Some(180.0);
        };

        let spread = self
            .history
            .iter()
            .map(|sample| wrap_180(sample.raw_degrees - mean).abs())
            .fold(0.0, f64::max);

        Some(spread)
    }

    /// Drop the smoothed value and the trailing window
    pub fn reset(&mut self) {
        self.history.clear();
        self.smoothed = None;
    }
}
