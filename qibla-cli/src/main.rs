use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use qibla_cli_shared::{
    FixedLocation, JsonFilePreferenceStore, JsonLinesSender, ReplayHeadingSource, bearing_report,
    load_settings, prelude::*,
};
use qibla_logic::{GeoPoint, PreferenceStore, QiblaSession};
use tokio::io::{AsyncBufRead, BufReader};

#[derive(Parser)]
/// Find the direction and distance to the Qibla
struct Cli {
    /// JSON file overriding the default session settings
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThemeAction {
    /// Print the current preferences
    Show,
    /// Switch between light and dark mode
    Toggle,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the bearing and distance from a location
    Bearing {
        /// Latitude in degrees, north positive
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in degrees, east positive
        #[arg(long, allow_negative_numbers = true)]
        long: f64,
        /// Heading the device is facing, in degrees clockwise from north
        #[arg(long, allow_negative_numbers = true)]
        heading: Option<f64>,
    },
    /// Run a compass session over a recorded heading stream, printing every view state
    Replay {
        /// Latitude in degrees, leave out to simulate a failed location fix
        #[arg(long, allow_negative_numbers = true, requires = "long")]
        lat: Option<f64>,
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        long: Option<f64>,
        /// File to read headings from, stdin when left out
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Validate the settings file and print the settings in effect
    CheckSettings,
    /// Read or change the saved theme
    Theme {
        /// File preferences are stored in
        #[arg(long, default_value = "preferences.json")]
        prefs: PathBuf,
        #[arg(value_enum)]
        action: ThemeAction,
    },
}

fn print_json(value: &impl serde::Serialize) -> Result {
    let encoded = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{encoded}");
    Ok(())
}

type HeadingInput = Box<dyn AsyncBufRead + Unpin + Send>;

async fn open_input(input: Option<PathBuf>) -> Result<HeadingInput> {
    let reader: HeadingInput = match input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    Ok(reader)
}

async fn replay(
    settings_path: Option<PathBuf>,
    location: Option<GeoPoint>,
    input: Option<PathBuf>,
) -> Result {
    let settings = load_settings(settings_path.as_deref())?;
    let reader = open_input(input).await?;

    let session = QiblaSession::new(
        settings,
        FixedLocation::new(location),
        Arc::new(ReplayHeadingSource::new(reader)),
        JsonLinesSender::stdout(),
    );

    session.acquire_location().await;

    let view = tokio::select! {
        view = session.main_loop() => view,
        Ok(_) = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping compass");
            session.stop_compass();
            session.main_loop().await
        }
    };

    info!(
        "Session finished in {:?} with advisories {:?}",
        view.phase, view.advisories
    );

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bearing { lat, long, heading } => {
            let settings = load_settings(cli.settings.as_deref())?;
            let report = bearing_report(&settings, GeoPoint::new(lat, long), heading)?;
            print_json(&report)?;
        }
        Commands::Replay { lat, long, input } => {
            let location = lat.zip(long).map(|(lat, long)| GeoPoint::new(lat, long));
            replay(cli.settings, location, input).await?;
        }
        Commands::CheckSettings => {
            let settings = load_settings(cli.settings.as_deref())?;
            print_json(&settings)?;
        }
        Commands::Theme { prefs, action } => {
            let store = JsonFilePreferenceStore::new(prefs);
            let prefs = match action {
                ThemeAction::Show => store.load(),
                ThemeAction::Toggle => store.toggle_theme(),
            }
            .with_context(|| format!("Failed to use preferences at {}", store.path().display()))?;
            print_json(&prefs)?;
        }
    }

    Ok(())
}
