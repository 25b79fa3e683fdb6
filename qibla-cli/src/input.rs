use qibla_logic::{HeadingSample, SensorEvent};

use crate::prelude::*;

/// Parse one line of a recorded heading stream.
///
/// A line is either a heading in degrees, a JSON [HeadingSample], or one of the words `denied`
/// / `unsupported`. Blank lines and `#` comments give `None`.
pub fn parse_line(line: &str) -> Result<Option<SensorEvent>> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let event = match line.to_ascii_lowercase().as_str() {
        "denied" => SensorEvent::PermissionDenied,
        "unsupported" => SensorEvent::Unsupported,
        _ if line.starts_with('{') => serde_json::from_str::<HeadingSample>(line)
            .context("Invalid heading sample JSON")?
            .into(),
        _ => {
            let degrees = line
                .parse::<f64>()
                .with_context(|| format!("Invalid heading \"{line}\""))?;
            if !degrees.is_finite() {
                bail!("Heading must be finite, got {degrees}");
            }
            HeadingSample::new(degrees).into()
        }
    };

    Ok(Some(event))
}
