use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::{
    heading::HeadingSample,
    location::{GeoPoint, LocationService, LocationSource},
    sensor::{HeadingSource, PermissionStatus, SensorEvent},
    session_state::{QiblaViewState, SessionState},
    settings::QiblaSettings,
};

pub trait StateUpdateSender {
    fn send_update(&self, state: &QiblaViewState);
}

/// Struct representing a running Qibla compass, gets location with [LocationService], listens
/// to the device's orientation via [HeadingSource], and pushes every change of the view state
/// out through a [StateUpdateSender].
pub struct QiblaSession<L: LocationService, H: HeadingSource, S: StateUpdateSender> {
    state: RwLock<SessionState>,
    location: L,
    heading: Arc<H>,
    state_update_sender: S,
    cancel: CancellationToken,
}

impl<L: LocationService, H: HeadingSource, S: StateUpdateSender> QiblaSession<L, H, S> {
    pub fn new(
        settings: QiblaSettings,
        location: L,
        heading: Arc<H>,
        state_update_sender: S,
    ) -> Self {
        Self {
            state: RwLock::new(SessionState::new(settings)),
            location,
            heading,
            state_update_sender,
            cancel: CancellationToken::new(),
        }
    }

    fn emit(&self, state: &SessionState) {
        self.state_update_sender.send_update(&state.as_view_state());
    }

    /// Ask the [LocationService] for a fix. Failures fall back to the last known or configured
    /// location and raise an advisory instead of erroring. Returns the location now in use.
    pub async fn acquire_location(&self) -> Option<GeoPoint> {
        let res = self.location.get_loc().await;

        let mut state = self.state.write().await;
        match res {
            Ok(point) if state.set_location(point, LocationSource::Device) => {
                info!("Got location fix {point:?}");
            }
            Ok(point) => {
                warn!("Location service returned an invalid point {point:?}");
                state.location_failed();
            }
            Err(why) => {
                warn!("Failed to get location: {why:?}");
                state.location_failed();
            }
        }
        self.emit(&state);
        state.location()
    }

    /// Use a point picked by the user. Returns whether it was accepted.
    pub async fn set_location(&self, point: GeoPoint) -> bool {
        let mut state = self.state.write().await;
        let accepted = state.set_location(point, LocationSource::Manual);
        if accepted {
            self.emit(&state);
        }
        accepted
    }

    /// Feed a heading sample directly. Samples are dropped once the compass has been stopped.
    pub async fn on_heading_sample(&self, sample: HeadingSample) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let mut state = self.state.write().await;
        self.consume_sample(&mut state, sample)
    }

    fn consume_sample(&self, state: &mut SessionState, sample: HeadingSample) -> bool {
        let accepted = state.on_heading_sample(sample);
        if accepted {
            self.emit(state);
        }
        accepted
    }

    pub async fn get_view_state(&self) -> QiblaViewState {
        self.state.read().await.as_view_state()
    }

    pub async fn clone_settings(&self) -> QiblaSettings {
        self.state.read().await.clone_settings()
    }

    /// Stop listening to the heading source, calling this more than once does nothing extra.
    pub fn stop_compass(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Handle one sensor event, returns whether the sensor loop should be broken.
    fn consume_event(&self, state: &mut SessionState, event: SensorEvent) -> bool {
        match event {
            SensorEvent::Heading(sample) => {
                self.consume_sample(state, sample);
                false
            }
            SensorEvent::Unsupported => {
                state.heading_unavailable(PermissionStatus::Unsupported);
                self.emit(state);
                true
            }
            SensorEvent::PermissionDenied => {
                state.heading_unavailable(PermissionStatus::Denied);
                self.emit(state);
                true
            }
            // Expected end of the stream, exit
            SensorEvent::Closed => true,
        }
    }

    /// Main loop of the compass: asks for sensor permission then consumes heading events until
    /// the source closes, the sensor is lost, or [Self::stop_compass] is called. The
    /// subscription is always released before returning. Returns the final view state.
    pub async fn main_loop(&self) -> QiblaViewState {
        let permission = tokio::select! {
            biased;

            _ = self.cancel.cancelled() => None,

            status = self.heading.request_permission() => Some(status),
        };

        match permission {
            Some(PermissionStatus::Granted) => {
                debug!("Orientation access granted");
                self.sensor_loop().await;
            }
            Some(status) => {
                info!("Orientation unavailable ({status:?}), staying on static bearing");
                let mut state = self.state.write().await;
                state.heading_unavailable(status);
                self.emit(&state);
            }
            None => {}
        }

        self.heading.unsubscribe().await;

        self.get_view_state().await
    }

    async fn sensor_loop(&self) {
        'sensor: loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break 'sensor;
                }

                events = self.heading.receive_events() => {
                    let mut state = self.state.write().await;
                    for event in events {
                        // Nothing may be processed after a stop, even mid-batch
                        if self.cancel.is_cancelled() || self.consume_event(&mut state, event) {
                            break 'sensor;
                        }
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn lock_state(&self) -> tokio::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().await
    }

    /// Tear the session down and hand back its update sender
    pub fn into_sender(self) -> S {
        self.state_update_sender
    }
}
