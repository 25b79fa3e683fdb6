use serde::{Deserialize, Serialize};

use crate::prelude::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// User preferences that outlive a session
pub struct Preferences {
    pub dark_mode: bool,
}

impl Preferences {
    pub fn toggle_theme(&mut self) {
        self.dark_mode = !self.dark_mode;
    }
}

/// Somewhere [Preferences] are persisted between runs. Readers get defaults for anything
/// missing or unreadable.
pub trait PreferenceStore {
    fn load(&self) -> Result<Preferences>;
    fn save(&self, prefs: &Preferences) -> Result;

    /// Flip the theme flag, persist it and return the new preferences
    fn toggle_theme(&self) -> Result<Preferences> {
        let mut prefs = self.load().context("Failed to load preferences")?;
        prefs.toggle_theme();
        self.save(&prefs).context("Failed to save preferences")?;
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct MemoryStore(RefCell<Option<Preferences>>);

    impl PreferenceStore for MemoryStore {
        fn load(&self) -> Result<Preferences> {
            Ok(self.0.borrow().clone().unwrap_or_default())
        }

        fn save(&self, prefs: &Preferences) -> Result {
            *self.0.borrow_mut() = Some(prefs.clone());
            Ok(())
        }
    }

    #[test]
    fn test_default_light() {
        let store = MemoryStore::default();
        assert!(!store.load().unwrap().dark_mode);
    }

    #[test]
    fn test_toggle_persists() {
        let store = MemoryStore::default();
        let prefs = store.toggle_theme().unwrap();
        assert!(prefs.dark_mode);
        assert!(store.load().unwrap().dark_mode);

        let prefs = store.toggle_theme().unwrap();
        assert!(!prefs.dark_mode);
        assert!(!store.load().unwrap().dark_mode);
    }
}
