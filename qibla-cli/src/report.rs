use qibla_logic::{BearingResult, GeoPoint, Orientation, QiblaSettings, compute, wrap_360};
use serde::Serialize;

use crate::prelude::*;

#[derive(Debug, Clone, Serialize)]
/// Where the device is pointing relative to the destination
pub struct HeadingReport {
    pub heading: f64,
    #[serde(flatten)]
    pub orientation: Orientation,
}

#[derive(Debug, Clone, Serialize)]
/// One-shot answer for the `bearing` command
pub struct BearingReport {
    pub source: GeoPoint,
    pub destination: GeoPoint,
    #[serde(flatten)]
    pub result: BearingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing: Option<HeadingReport>,
}

/// Build a [BearingReport] from `source` to the configured destination, optionally for a
/// device facing `heading` degrees
pub fn bearing_report(
    settings: &QiblaSettings,
    source: GeoPoint,
    heading: Option<f64>,
) -> Result<BearingReport> {
    if !source.is_valid() {
        bail!("{source:?} is not a valid location");
    }

    let result = compute(source, settings.destination);

    let facing = heading
        .map(|heading| {
            if !heading.is_finite() {
                bail!("Heading must be finite, got {heading}");
            }
            let heading = wrap_360(heading);
            Ok(HeadingReport {
                heading,
                orientation: settings.thresholds.orient(result.bearing_degrees, heading),
            })
        })
        .transpose()?;

    Ok(BearingReport {
        source,
        destination: settings.destination,
        result,
        facing,
    })
}
