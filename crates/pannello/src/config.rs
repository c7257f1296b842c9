//! Configuration loading from environment variables.

use std::path::PathBuf;

/// Backend used when `PANNELLO_API_URL` is not set
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Store file used when `PANNELLO_STORE` is not set
pub const DEFAULT_STORE_PATH: &str = "pannello-store.json";

/// Runtime settings for the dashboard.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the backend serving /weather, /PVgen, ...
    pub api_url: String,
    /// Path of the persisted profile store
    pub store_path: PathBuf,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// Reads `PANNELLO_API_URL` and `PANNELLO_STORE`, either from the
    /// environment or from a `.env` file. Both fall back to defaults.
    pub fn from_env() -> Self {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("PANNELLO_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let store_path = lookup("PANNELLO_STORE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            store_path,
        }
    }

    /// Apply command line overrides on top of the environment
    pub fn with_overrides(mut self, api_url: Option<String>, store_path: Option<PathBuf>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = store_path {
            self.store_path = path;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[]));
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.store_path, PathBuf::from(DEFAULT_STORE_PATH));
    }

    #[test]
    fn test_settings_from_values() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("PANNELLO_API_URL", "http://backend:5000/"),
            ("PANNELLO_STORE", "/var/lib/pannello/store.json"),
        ]));
        assert_eq!(settings.api_url, "http://backend:5000");
        assert_eq!(
            settings.store_path,
            PathBuf::from("/var/lib/pannello/store.json")
        );
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[("PANNELLO_API_URL", "  ")]));
        assert_eq!(settings.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_overrides_win() {
        let settings = Settings::from_lookup(lookup_from(&[])).with_overrides(
            Some("http://other:8000/".to_string()),
            Some(PathBuf::from("custom.json")),
        );
        assert_eq!(settings.api_url, "http://other:8000");
        assert_eq!(settings.store_path, PathBuf::from("custom.json"));
    }
}
