//! Persistent profile storage.
//!
//! The store file is a flat JSON object of string keys to string values, the
//! same shape as browser local storage. The profile lives under a single
//! fixed key and is always written as a whole.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{ProfileField, UserProfile};

/// Key of the profile record inside the store file
pub const PROFILE_KEY: &str = "pvData";

/// Fields that must be usable before the dashboard fetches anything
pub const REQUIRED_FIELDS: &[ProfileField] = &[
    ProfileField::Latitude,
    ProfileField::Longitude,
    ProfileField::SurfaceArea,
    ProfileField::PanelEfficiency,
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid store content: {0}")]
    Json(#[from] serde_json::Error),
}

/// File-backed key/value store holding the user profile
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored profile.
    ///
    /// A missing file, a missing key and malformed content all yield `None`;
    /// malformed content is logged and otherwise treated as absent.
    pub fn load(&self) -> Option<UserProfile> {
        let entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable store");
                return None;
            }
        };

        let raw = entries.get(PROFILE_KEY)?;
        match serde_json::from_str::<UserProfile>(raw) {
            Ok(profile) => {
                debug!(path = %self.path.display(), "Profile loaded");
                Some(profile)
            }
            Err(e) => {
                warn!(error = %e, key = PROFILE_KEY, "Ignoring malformed profile record");
                None
            }
        }
    }

    /// Overwrite the stored profile. Other keys in the store are kept.
    pub fn save(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            warn!(error = %e, "Store unreadable, starting from an empty one");
            BTreeMap::new()
        });

        entries.insert(PROFILE_KEY.to_string(), serde_json::to_string(profile)?);
        let json = serde_json::to_string_pretty(&entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        std::fs::write(&self.path, json).map_err(|source| self.io_error(source))?;

        debug!(path = %self.path.display(), "Profile saved");
        Ok(())
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Check the fields every panel depends on: coordinates present, surface and
/// efficiency strictly positive. Email, timezone and altitude are left to the
/// panels that need them.
pub fn validate_required(profile: &UserProfile) -> bool {
    profile.missing_fields(REQUIRED_FIELDS).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeeScheme;
    use tempfile::TempDir;

    fn make_profile() -> UserProfile {
        UserProfile {
            country: "Italy North".to_string(),
            latitude: Some(45.07),
            longitude: Some(7.69),
            altitude: Some(240.0),
            timezone: "Europe/Rome".to_string(),
            surface_area: Some(12.5),
            panel_efficiency: Some(0.21),
            fee_scheme: Some(FeeScheme::Fixed),
            fixed_price: Some(0.12),
            account_email: "user@example.com".to_string(),
        }
    }

    fn temp_store() -> (TempDir, ProfileStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = ProfileStore::new(temp_dir.path().join("store.json"));
        (temp_dir, store)
    }

    // ========== load / save ==========

    #[test]
    fn test_load_missing_file_returns_none() {
        let (_temp_dir, store) = temp_store();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let (_temp_dir, store) = temp_store();
        let profile = make_profile();

        store.save(&profile).unwrap();

        assert_eq!(store.load(), Some(profile));
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let (_temp_dir, store) = temp_store();
        store.save(&make_profile()).unwrap();

        let replacement = UserProfile {
            latitude: Some(1.0),
            longitude: Some(2.0),
            surface_area: Some(3.0),
            panel_efficiency: Some(0.5),
            ..Default::default()
        };
        store.save(&replacement).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, replacement);
        assert!(loaded.account_email.is_empty());
    }

    #[test]
    fn test_save_keeps_unrelated_keys() {
        let (_temp_dir, store) = temp_store();
        std::fs::write(store.path(), r#"{"theme":"dark"}"#).unwrap();

        store.save(&make_profile()).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        let entries: BTreeMap<String, String> = serde_json::from_str(&content).unwrap();
        assert_eq!(entries.get("theme").map(String::as_str), Some("dark"));
        assert!(entries.contains_key(PROFILE_KEY));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let store = ProfileStore::new(temp_dir.path().join("nested/dir/store.json"));

        store.save(&make_profile()).unwrap();

        assert!(store.path().exists());
    }

    #[test]
    fn test_load_malformed_store_returns_none() {
        let (_temp_dir, store) = temp_store();
        std::fs::write(store.path(), "not json at all").unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_malformed_record_returns_none() {
        let (_temp_dir, store) = temp_store();
        std::fs::write(store.path(), r#"{"pvData":"{\"latitude\":\"north\"}"}"#).unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_without_profile_key_returns_none() {
        let (_temp_dir, store) = temp_store();
        std::fs::write(store.path(), r#"{"other":"value"}"#).unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_replaces_corrupt_store() {
        let (_temp_dir, store) = temp_store();
        std::fs::write(store.path(), "{{{").unwrap();

        store.save(&make_profile()).unwrap();

        assert_eq!(store.load(), Some(make_profile()));
    }

    // ========== validate_required ==========

    #[test]
    fn test_validate_required_accepts_complete_profile() {
        assert!(validate_required(&make_profile()));
    }

    #[test]
    fn test_validate_required_rejects_missing_latitude() {
        let mut profile = make_profile();
        profile.latitude = None;
        assert!(!validate_required(&profile));
    }

    #[test]
    fn test_validate_required_rejects_zero_surface() {
        let mut profile = make_profile();
        profile.surface_area = Some(0.0);
        assert!(!validate_required(&profile));
    }

    #[test]
    fn test_validate_required_rejects_negative_efficiency() {
        let mut profile = make_profile();
        profile.panel_efficiency = Some(-1.0);
        assert!(!validate_required(&profile));
    }

    #[test]
    fn test_validate_required_ignores_email_timezone_altitude() {
        let mut profile = make_profile();
        profile.account_email.clear();
        profile.timezone.clear();
        profile.altitude = None;
        assert!(validate_required(&profile));
    }
}
