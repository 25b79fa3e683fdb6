use std::collections::BTreeSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    alignment::{AlignmentState, TurnGuidance, relative_direction},
    geo::{self, BearingResult, wrap_360},
    heading::{HeadingSample, HeadingSmoother},
    location::{GeoPoint, LocationSource},
    sensor::PermissionStatus,
    settings::QiblaSettings,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionPhase {
    /// No location fix yet
    AwaitingLocation,
    /// Location known, bearing and distance are available but there's no live heading
    AwaitingHeadingPermission,
    /// Live compass, updated on every heading sample and location change
    Active,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
/// Non-fatal problems, the session keeps running at reduced precision
pub enum Advisory {
    /// Geolocation failed or was denied, the fallback or last known location is in use
    LocationUnavailable,
    /// No orientation sensor, only the static bearing is shown
    HeadingUnsupported,
    /// The user refused orientation access, only the static bearing is shown
    PermissionDenied,
}

impl Advisory {
    /// The advisory to raise for a sensor permission outcome, if any
    pub fn for_permission(status: PermissionStatus) -> Option<Self> {
        match status {
            PermissionStatus::Granted => None,
            PermissionStatus::Denied => Some(Self::PermissionDenied),
            PermissionStatus::Unsupported => Some(Self::HeadingUnsupported),
        }
    }

    /// Whether this advisory means live headings stopped arriving
    pub fn is_heading_loss(&self) -> bool {
        matches!(self, Self::HeadingUnsupported | Self::PermissionDenied)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Read-only snapshot of a session for the rendering layer
pub struct QiblaViewState {
    pub phase: SessionPhase,
    pub location: Option<GeoPoint>,
    pub location_source: Option<LocationSource>,
    /// Bearing from true north to the destination, [0, 360)
    pub target_bearing: Option<f64>,
    pub distance_km: Option<f64>,
    /// [0, 360)
    pub smoothed_heading: Option<f64>,
    /// How far to rotate clockwise to face the destination, (-180, 180]. Only set while
    /// headings are live.
    pub relative_direction: Option<f64>,
    pub alignment: Option<AlignmentState>,
    pub guidance: Option<TurnGuidance>,
    /// Clockwise needle rotation on a device-fixed dial, [0, 360)
    pub needle_rotation: Option<f64>,
    /// The raw heading window is too scattered to trust
    pub needs_calibration: bool,
    pub advisories: Vec<Advisory>,
}

impl QiblaViewState {
    /// Only a static bearing from north can be shown, either no heading has arrived yet or the
    /// sensor was lost
    pub fn is_static(&self) -> bool {
        self.phase != SessionPhase::Active || self.advisories.iter().any(Advisory::is_heading_loss)
    }
}

/// Synchronous core of a Qibla session, every method runs to completion without waiting.
pub struct SessionState {
    settings: QiblaSettings,
    phase: SessionPhase,
    location: Option<(GeoPoint, LocationSource)>,
    bearing: Option<BearingResult>,
    smoother: HeadingSmoother,
    relative_direction: Option<f64>,
    advisories: BTreeSet<Advisory>,
}

impl SessionState {
    pub fn new(settings: QiblaSettings) -> Self {
        let smoother = HeadingSmoother::from_settings(&settings);
        Self {
            settings,
            phase: SessionPhase::AwaitingLocation,
            location: None,
            bearing: None,
            smoother,
            relative_direction: None,
            advisories: BTreeSet::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn settings(&self) -> &QiblaSettings {
        &self.settings
    }

    pub fn clone_settings(&self) -> QiblaSettings {
        self.settings.clone()
    }

    pub fn location(&self) -> Option<GeoPoint> {
        self.location.map(|(point, _)| point)
    }

    pub fn bearing(&self) -> Option<BearingResult> {
        self.bearing
    }

    pub fn has_advisory(&self, advisory: Advisory) -> bool {
        self.advisories.contains(&advisory)
    }

    fn transition(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            debug!("Session phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn add_advisory(&mut self, advisory: Advisory) {
        if self.advisories.insert(advisory) {
            debug!("Advisory raised: {advisory:?}");
        }
    }

    fn clear_advisory(&mut self, advisory: Advisory) {
        if self.advisories.remove(&advisory) {
            debug!("Advisory cleared: {advisory:?}");
        }
    }

    fn recompute_relative(&mut self) {
        self.relative_direction = self
            .bearing
            .zip(self.smoother.current())
            .map(|(bearing, heading)| relative_direction(bearing.bearing_degrees, heading.degrees));
    }

    /// Use a new location and recompute the target bearing and distance.
    ///
    /// Returns whether the point was accepted, invalid points leave the last known good location
    /// in place.
    pub fn set_location(&mut self, point: GeoPoint, source: LocationSource) -> bool {
        if !point.is_valid() {
            warn!("Ignoring invalid location {point:?}");
            return false;
        }

        if point.is_polar() {
            warn!("Location {point:?} is on a pole, bearing will be degenerate");
        }

        self.bearing = Some(geo::compute(point, self.settings.destination));
        self.location = Some((point, source));

        if source != LocationSource::Fallback {
            self.clear_advisory(Advisory::LocationUnavailable);
        }

        if self.phase == SessionPhase::AwaitingLocation {
            if self.smoother.current().is_some() {
                self.transition(SessionPhase::Active);
            } else {
                self.transition(SessionPhase::AwaitingHeadingPermission);
            }
        }

        self.recompute_relative();
        true
    }

    /// Geolocation failed, keep the last known good location or fall back to the configured
    /// default if there's none.
    pub fn location_failed(&mut self) {
        self.add_advisory(Advisory::LocationUnavailable);
        if self.location.is_none() {
            let fallback = self.settings.fallback_location;
            warn!("No location available, falling back to {fallback:?}");
            self.set_location(fallback, LocationSource::Fallback);
        }
    }

    /// The heading source can't deliver, stay on the static bearing
    pub fn heading_unavailable(&mut self, status: PermissionStatus) {
        if let Some(advisory) = Advisory::for_permission(status) {
            self.add_advisory(advisory);
        }
    }

    /// Feed one raw heading sample. Returns whether it was used.
    pub fn on_heading_sample(&mut self, sample: HeadingSample) -> bool {
        if !sample.raw_degrees.is_finite() {
            warn!("Ignoring non-finite heading {}", sample.raw_degrees);
            return false;
        }

        self.smoother.ingest(sample);

        self.clear_advisory(Advisory::HeadingUnsupported);
        self.clear_advisory(Advisory::PermissionDenied);

        if self.phase == SessionPhase::AwaitingHeadingPermission {
            self.transition(SessionPhase::Active);
        }

        self.recompute_relative();
        true
    }

    fn heading_lost(&self) -> bool {
        self.advisories.iter().any(Advisory::is_heading_loss)
    }

    fn needs_calibration(&self) -> bool {
        self.smoother.is_full()
            && self
                .smoother
                .spread()
                .is_some_and(|spread| spread > self.settings.calibration_spread_degrees)
    }

    pub fn as_view_state(&self) -> QiblaViewState {
        // No guidance while the sensor is lost, the last smoothed heading is still shown
        let orientation = self
            .relative_direction
            .filter(|_| !self.heading_lost())
            .map(|relative| self.settings.thresholds.assess(relative));
        QiblaViewState {
            phase: self.phase,
            location: self.location(),
            location_source: self.location.map(|(_, source)| source),
            target_bearing: self.bearing.map(|b| b.bearing_degrees),
            distance_km: self.bearing.map(|b| b.distance_km),
            smoothed_heading: self.smoother.current().map(|h| h.degrees),
            relative_direction: orientation.map(|o| o.relative_direction),
            alignment: orientation.map(|o| o.alignment),
            guidance: orientation.map(|o| o.guidance),
            needle_rotation: orientation.map(|o| wrap_360(o.relative_direction)),
            needs_calibration: self.needs_calibration(),
            advisories: self.advisories.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alignment::TurnDirection, location::KAABA};

    const NEAR_MECCA: GeoPoint = GeoPoint::new(21.0, 39.0);

    fn sample(raw: f64) -> HeadingSample {
        HeadingSample::new(raw)
    }

    fn mk_state() -> SessionState {
        SessionState::new(QiblaSettings::default())
    }

    #[test]
    fn test_initial_state() {
        let state = mk_state();
        let view = state.as_view_state();
        assert_eq!(view.phase, SessionPhase::AwaitingLocation);
        assert!(view.target_bearing.is_none());
        assert!(view.alignment.is_none());
        assert!(view.advisories.is_empty());
        assert!(view.is_static());
    }

    #[test]
    fn test_set_location_populates_bearing() {
        let mut state = mk_state();
        assert!(state.set_location(NEAR_MECCA, LocationSource::Manual));

        let view = state.as_view_state();
        assert_eq!(view.phase, SessionPhase::AwaitingHeadingPermission);
        assert_eq!(view.location, Some(NEAR_MECCA));
        assert_eq!(view.location_source, Some(LocationSource::Manual));
        let bearing = view.target_bearing.expect("No bearing");
        assert!((bearing - 61.1045).abs() < 0.01);
        assert!(view.distance_km.is_some_and(|d| d < 100.0));
        assert!(view.alignment.is_none());
        assert!(view.relative_direction.is_none());
        assert!(view.guidance.is_none());
    }

    #[test]
    fn test_invalid_location_keeps_last_good() {
        let mut state = mk_state();
        assert!(!state.set_location(GeoPoint::new(95.0, 0.0), LocationSource::Manual));
        assert_eq!(state.phase(), SessionPhase::AwaitingLocation);

        state.set_location(NEAR_MECCA, LocationSource::Device);
        assert!(!state.set_location(GeoPoint::new(f64::NAN, 0.0), LocationSource::Device));
        assert_eq!(state.location(), Some(NEAR_MECCA));
    }

    #[test]
    fn test_first_heading_activates() {
        let mut state = mk_state();
        state.set_location(NEAR_MECCA, LocationSource::Device);
        assert!(state.on_heading_sample(sample(61.0)));

        let view = state.as_view_state();
        assert_eq!(view.phase, SessionPhase::Active);
        assert!(!view.is_static());
        assert_eq!(view.smoothed_heading, Some(61.0));
        let relative = view.relative_direction.expect("No relative direction");
        assert!((relative - 0.1045).abs() < 0.01);
        assert_eq!(view.alignment, Some(AlignmentState::Aligned));
        assert_eq!(
            view.guidance.map(|g| g.direction),
            Some(TurnDirection::Hold)
        );
    }

    #[test]
    fn test_relative_direction_sign() {
        let mut state = mk_state();
        state.set_location(NEAR_MECCA, LocationSource::Device);

        // Facing north, target is ~61° clockwise
        state.on_heading_sample(sample(0.0));
        let view = state.as_view_state();
        let relative = view.relative_direction.expect("No relative direction");
        assert!(relative > 60.0 && relative < 62.0);
        assert_eq!(view.alignment, Some(AlignmentState::Off));
        assert_eq!(
            view.guidance.map(|g| g.direction),
            Some(TurnDirection::Right)
        );
        let rotation = view.needle_rotation.expect("No rotation");
        assert!((rotation - relative).abs() < 1e-9);
    }

    #[test]
    fn test_needle_rotation_wraps_negative() {
        let mut state = mk_state();
        state.set_location(NEAR_MECCA, LocationSource::Device);
        state.on_heading_sample(sample(90.0));
        let view = state.as_view_state();
        let relative = view.relative_direction.expect("No relative direction");
        assert!(relative < 0.0);
        assert_eq!(
            view.guidance.map(|g| g.direction),
            Some(TurnDirection::Left)
        );
        let rotation = view.needle_rotation.expect("No rotation");
        assert!((rotation - (relative + 360.0)).abs() < 1e-9);
    }

    #[test]
    fn test_heading_before_location() {
        let mut state = mk_state();
        state.on_heading_sample(sample(10.0));
        assert_eq!(state.phase(), SessionPhase::AwaitingLocation);
        assert!(state.as_view_state().relative_direction.is_none());

        state.set_location(NEAR_MECCA, LocationSource::Device);
        assert_eq!(state.phase(), SessionPhase::Active);
        assert!(state.as_view_state().relative_direction.is_some());
    }

    #[test]
    fn test_location_failure_falls_back() {
        let mut state = mk_state();
        state.location_failed();

        let view = state.as_view_state();
        assert_eq!(view.phase, SessionPhase::AwaitingHeadingPermission);
        assert_eq!(view.location, Some(state.settings().fallback_location));
        assert_eq!(view.location_source, Some(LocationSource::Fallback));
        assert_eq!(view.advisories, vec![Advisory::LocationUnavailable]);
        assert!(view.target_bearing.is_some());
    }

    #[test]
    fn test_location_failure_keeps_last_good() {
        let mut state = mk_state();
        state.set_location(NEAR_MECCA, LocationSource::Device);
        state.location_failed();
        assert_eq!(state.location(), Some(NEAR_MECCA));
        assert!(state.has_advisory(Advisory::LocationUnavailable));

        state.set_location(KAABA, LocationSource::Device);
        assert!(!state.has_advisory(Advisory::LocationUnavailable));
    }

    #[test]
    fn test_permission_denied_stays_static() {
        let mut state = mk_state();
        state.set_location(NEAR_MECCA, LocationSource::Device);
        state.heading_unavailable(PermissionStatus::Denied);
        state.heading_unavailable(PermissionStatus::Granted);

        let view = state.as_view_state();
        assert_eq!(view.phase, SessionPhase::AwaitingHeadingPermission);
        assert_eq!(view.advisories, vec![Advisory::PermissionDenied]);
        assert!(view.target_bearing.is_some());
        assert!(view.distance_km.is_some());
    }

    #[test]
    fn test_non_finite_heading_ignored() {
        let mut state = mk_state();
        state.set_location(NEAR_MECCA, LocationSource::Device);
        assert!(!state.on_heading_sample(sample(f64::NAN)));
        assert!(!state.on_heading_sample(sample(f64::INFINITY)));
        assert_eq!(state.phase(), SessionPhase::AwaitingHeadingPermission);
    }

    #[test]
    fn test_relocation_recomputes() {
        let mut state = mk_state();
        state.set_location(NEAR_MECCA, LocationSource::Device);
        state.on_heading_sample(sample(0.0));
        let before = state.as_view_state().relative_direction;

        state.set_location(GeoPoint::new(-33.8688, 151.2093), LocationSource::Manual);
        let view = state.as_view_state();
        assert_eq!(view.phase, SessionPhase::Active);
        assert_ne!(view.relative_direction, before);
        let relative = view.relative_direction.expect("No relative direction");
        assert!((relative - (277.4996 - 360.0)).abs() < 0.01);
    }

    #[test]
    fn test_crossing_north_has_no_jump() {
        let mut state = mk_state();
        state.set_location(NEAR_MECCA, LocationSource::Device);

        let mut prev: Option<f64> = None;
        for raw in [350.0, 354.0, 358.0, 2.0, 6.0, 10.0, 6.0, 2.0, 358.0, 354.0] {
            state.on_heading_sample(sample(raw));
            let relative = state
                .as_view_state()
                .relative_direction
                .expect("No relative direction");
            if let Some(prev) = prev {
                assert!(
                    (relative - prev).abs() < 10.0,
                    "Relative direction jumped from {prev} to {relative}"
                );
            }
            prev = Some(relative);
        }
    }

    #[test]
    fn test_calibration_flag() {
        let settings = QiblaSettings {
            buffer_size: 3,
            calibration_spread_degrees: 30.0,
            ..Default::default()
        };
        let mut state = SessionState::new(settings);
        state.set_location(NEAR_MECCA, LocationSource::Device);

        state.on_heading_sample(sample(0.0));
        state.on_heading_sample(sample(90.0));
        // Window not full yet
        assert!(!state.as_view_state().needs_calibration);

        state.on_heading_sample(sample(200.0));
        assert!(state.as_view_state().needs_calibration);

        for _ in 0..3 {
            state.on_heading_sample(sample(45.0));
        }
        assert!(!state.as_view_state().needs_calibration);
    }

    #[test]
    fn test_sensor_loss_goes_static() {
        let mut state = mk_state();
        state.set_location(NEAR_MECCA, LocationSource::Device);
        state.on_heading_sample(sample(10.0));
        assert!(!state.as_view_state().is_static());

        state.heading_unavailable(PermissionStatus::Unsupported);
        let view = state.as_view_state();
        assert_eq!(view.phase, SessionPhase::Active);
        assert!(view.is_static());
        assert_eq!(view.advisories, vec![Advisory::HeadingUnsupported]);
        assert_eq!(view.smoothed_heading, Some(10.0));
        assert!(view.relative_direction.is_none());
        assert!(view.alignment.is_none());
        assert!(view.guidance.is_none());
        assert!(view.needle_rotation.is_none());
        assert!(view.target_bearing.is_some());

        // A fresh reading brings the live compass back
        state.on_heading_sample(sample(20.0));
        let view = state.as_view_state();
        assert!(!view.is_static());
        assert!(view.advisories.is_empty());
        assert!(view.guidance.is_some());
    }

    #[test]
    fn test_nan_smoothing_factor() {
        let settings = QiblaSettings {
            smoothing_factor: f64::NAN,
            ..Default::default()
        };
        let mut state = SessionState::new(settings);
        state.set_location(NEAR_MECCA, LocationSource::Device);
        state.on_heading_sample(sample(10.0));
        state.on_heading_sample(sample(20.0));

        let view = state.as_view_state();
        let heading = view.smoothed_heading.expect("No heading");
        assert!((0.0..360.0).contains(&heading), "Heading {heading} out of range");
        let relative = view.relative_direction.expect("No relative direction");
        assert!(relative.is_finite());
        assert_eq!(view.alignment, Some(AlignmentState::Off));
    }
}
