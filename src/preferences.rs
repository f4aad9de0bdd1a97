//! Key-value preferences
//!
//! The auth façade remembers the address a sign-in link was sent to so the
//! link can be completed later. Storage is delegated to a [`Preferences`]
//! implementation supplied by the host application.

use crate::error::FirebaseError;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;

/// Well-known preference keys
pub mod preference_keys {
    /// Address the last sign-in link was sent to
    pub const SIGN_IN_LINK_EMAIL: &str = "sign_in_link_email";
}

/// Persistent string key-value store
pub trait Preferences: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>, FirebaseError>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<(), FirebaseError>;

    /// Delete a value; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), FirebaseError>;
}

fn poisoned() -> FirebaseError {
    FirebaseError::Preferences("preferences lock poisoned".to_string())
}

/// In-memory preferences, lost on drop
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferences {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, FirebaseError> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FirebaseError> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), FirebaseError> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.remove(key);
        Ok(())
    }
}

/// Preferences persisted as a JSON object in a single file.
///
/// The whole file is rewritten on every mutation: the new contents go to a
/// temporary file in the same directory, which then replaces the old one.
/// The in-memory map only changes once that write succeeded.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl JsonFilePreferences {
    /// Open `path`, starting empty if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FirebaseError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<(), FirebaseError> {
        let json = serde_json::to_string_pretty(values)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Apply `change` to a copy of the map, persist it, then publish it
    fn update(&self, change: impl FnOnce(&mut HashMap<String, String>) -> bool) -> Result<(), FirebaseError> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        let mut next = values.clone();
        if !change(&mut next) {
            return Ok(());
        }

        self.persist(&next)?;
        *values = next;
        Ok(())
    }
}

impl Preferences for JsonFilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, FirebaseError> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FirebaseError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), FirebaseError> {
        // Removing a missing key does not touch the file
        self.update(|values| values.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_set_get_remove() {
        let prefs = MemoryPreferences::new();
        assert_eq!(prefs.get("k").unwrap(), None);

        prefs.set("k", "v").unwrap();
        assert_eq!(prefs.get("k").unwrap().as_deref(), Some("v"));

        prefs.remove("k").unwrap();
        assert_eq!(prefs.get("k").unwrap(), None);
    }

    #[test]
    fn test_memory_remove_missing_is_ok() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.remove("missing").is_ok());
    }

    #[test]
    fn test_json_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = JsonFilePreferences::open(&path).unwrap();
        prefs
            .set(preference_keys::SIGN_IN_LINK_EMAIL, "user@example.com")
            .unwrap();
        drop(prefs);

        let reopened = JsonFilePreferences::open(&path).unwrap();
        assert_eq!(
            reopened.get(preference_keys::SIGN_IN_LINK_EMAIL).unwrap().as_deref(),
            Some("user@example.com")
        );

        reopened.remove(preference_keys::SIGN_IN_LINK_EMAIL).unwrap();
        let again = JsonFilePreferences::open(&path).unwrap();
        assert_eq!(again.get(preference_keys::SIGN_IN_LINK_EMAIL).unwrap(), None);
    }

    #[test]
    fn test_json_file_rejects_corrupt_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();

        let result = JsonFilePreferences::open(&path);
        assert!(matches!(result, Err(FirebaseError::Serialization(_))));
    }

    #[test]
    fn test_json_file_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = JsonFilePreferences::open(&path).unwrap();
        prefs.set("k", "v").unwrap();

        // A directory in place of the file makes every write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(prefs.remove("k").is_err());
        assert_eq!(prefs.get("k").unwrap().as_deref(), Some("v"));

        assert!(prefs.set("other", "x").is_err());
        assert_eq!(prefs.get("other").unwrap(), None);
    }

    #[test]
    fn test_json_file_write_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = JsonFilePreferences::open(&path).unwrap();
        prefs.set("a", "1").unwrap();
        prefs.set("b", "2").unwrap();
        prefs.remove("a").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let reopened = JsonFilePreferences::open(&path).unwrap();
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
    }
}
