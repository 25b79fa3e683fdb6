use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use qibla_logic::{PreferenceStore, Preferences, QiblaSettings};

use crate::prelude::*;

/// Keeps [Preferences] in a JSON file on disk
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn load(&self) -> Result<Preferences> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(why) if why.kind() == ErrorKind::NotFound => {
                debug!("No preferences at {}, using defaults", self.path.display());
                return Ok(Preferences::default());
            }
            Err(why) => {
                return Err(why)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        match serde_json::from_str(&raw) {
            Ok(prefs) => Ok(prefs),
            Err(why) => {
                warn!(
                    "Preferences at {} are unreadable, using defaults: {why:?}",
                    self.path.display()
                );
                Ok(Preferences::default())
            }
        }
    }

    fn save(&self, prefs: &Preferences) -> Result {
        let encoded =
            serde_json::to_string_pretty(prefs).context("Failed to serialize preferences")?;
        fs::write(&self.path, encoded)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Read [QiblaSettings] from a JSON file, or the defaults when no path is given. The result is
/// always validated.
pub fn load_settings(path: Option<&Path>) -> Result<QiblaSettings> {
    let settings = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            serde_json::from_str::<QiblaSettings>(&raw)
                .with_context(|| format!("Failed to parse settings file {}", path.display()))?
        }
        None => QiblaSettings::default(),
    };

    settings.validate().context("Invalid settings")?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempPath(PathBuf);

    impl TempPath {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir()
                .join(format!("qibla-cli-{}-{name}.json", std::process::id()));
            let _ = fs::remove_file(&path);
            Self(path)
        }
    }

    impl Drop for TempPath {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    #[test]
    fn test_missing_prefs_default() {
        let tmp = TempPath::new("missing-prefs");
        let store = JsonFilePreferenceStore::new(&tmp.0);
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn test_toggle_round_trips_through_file() {
        let tmp = TempPath::new("toggle-prefs");
        let store = JsonFilePreferenceStore::new(&tmp.0);

        assert!(store.toggle_theme().unwrap().dark_mode);
        assert!(JsonFilePreferenceStore::new(&tmp.0).load().unwrap().dark_mode);

        assert!(!store.toggle_theme().unwrap().dark_mode);
        assert!(!store.load().unwrap().dark_mode);
    }

    #[test]
    fn test_corrupt_prefs_default() {
        let tmp = TempPath::new("corrupt-prefs");
        fs::write(&tmp.0, "{ not json").unwrap();
        let store = JsonFilePreferenceStore::new(&tmp.0);
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn test_default_settings() {
        assert_eq!(load_settings(None).unwrap(), QiblaSettings::default());
    }

    #[test]
    fn test_partial_settings_file() {
        let tmp = TempPath::new("partial-settings");
        fs::write(&tmp.0, r#"{ "smoothing_factor": 0.5, "buffer_size": 8 }"#).unwrap();

        let settings = load_settings(Some(tmp.0.as_path())).unwrap();
        assert_eq!(settings.smoothing_factor, 0.5);
        assert_eq!(settings.buffer_size, 8);
        assert_eq!(settings.destination, QiblaSettings::default().destination);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let tmp = TempPath::new("invalid-settings");
        fs::write(&tmp.0, r#"{ "smoothing_factor": 0.0 }"#).unwrap();
        assert!(load_settings(Some(tmp.0.as_path())).is_err());
    }

    #[test]
    fn test_missing_settings_file_errors() {
        let tmp = TempPath::new("no-settings");
        assert!(load_settings(Some(tmp.0.as_path())).is_err());
    }
}
