mod input;
mod replay;
mod report;
mod store;

pub mod prelude {
    pub use anyhow::{Context, anyhow, bail};
    pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

pub use input::parse_line;
pub use prelude::*;
pub use replay::{FixedLocation, JsonLinesSender, ReplayHeadingSource};
pub use report::{BearingReport, HeadingReport, bearing_report};
pub use store::{JsonFilePreferenceStore, load_settings};
