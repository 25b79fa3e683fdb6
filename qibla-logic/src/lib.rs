mod alignment;
mod geo;
mod heading;
mod location;
mod preferences;
mod sensor;
mod session;
mod session_state;
mod settings;

pub use alignment::{
    AlignmentState, AlignmentThresholds, Orientation, TurnDirection, TurnGuidance,
    relative_direction,
};
pub use geo::{
    BearingResult, EARTH_RADIUS_KM, compute, compute_bearing, compute_distance_km, wrap_180,
    wrap_360,
};
pub use heading::{
    DEFAULT_SMOOTHING_FACTOR, HeadingSample, HeadingSmoother, SmoothedHeading, UtcDT,
};
pub use location::{GeoPoint, KAABA, LocationComponent, LocationService, LocationSource};
pub use preferences::{PreferenceStore, Preferences};
pub use sensor::{HeadingSource, PermissionStatus, SensorEvent};
pub use session::{QiblaSession, StateUpdateSender};
pub use session_state::{Advisory, QiblaViewState, SessionPhase, SessionState};
pub use settings::QiblaSettings;

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
