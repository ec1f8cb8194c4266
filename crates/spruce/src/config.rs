use crate::error::{Result, SpruceError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

pub const DEFAULT_KEEP_VERSIONS: usize = 1;
pub const DEFAULT_STALE_DAYS: i64 = 90;

/// Connection and tuning preferences.
///
/// Resolution order: explicit `--prefs` path, then the `SPRUCE_PREFS`
/// environment variable, then `preferences.toml` in the XDG config
/// directory for `spruce`.
#[derive(Debug, Clone, Deserialize)]
pub struct Preferences {
    pub url: String,
    pub username: String,
    pub password: String,

    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    /// Newest package versions per base name kept out of the
    /// superseded-version report.
    #[serde(default = "default_keep_versions")]
    pub keep_versions: usize,

    /// Days without a check-in before a device counts as stale.
    #[serde(default = "default_stale_days")]
    pub stale_days: i64,
}

fn default_ssl_verify() -> bool {
    true
}

fn default_keep_versions() -> usize {
    DEFAULT_KEEP_VERSIONS
}

fn default_stale_days() -> i64 {
    DEFAULT_STALE_DAYS
}

impl Preferences {
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(override_path)?;
        log::debug!("loading preferences from {}", path.display());
        let content = std::fs::read_to_string(&path).map_err(|e| {
            SpruceError::Config(format!(
                "Cannot read preferences file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| SpruceError::Config(format!("Failed to parse preferences: {}", e)))
    }

    fn resolve_path(override_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = override_path {
            return Ok(path.to_path_buf());
        }
        if let Ok(env_path) = std::env::var("SPRUCE_PREFS") {
            return Ok(PathBuf::from(env_path));
        }
        BaseDirectories::with_prefix("spruce")
            .ok()
            .and_then(|xdg| xdg.find_config_file("preferences.toml"))
            .ok_or_else(|| {
                SpruceError::Config(
                    "No preferences file found. Create ~/.config/spruce/preferences.toml \
                     or pass --prefs <FILE>"
                        .to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_preferences() {
        let prefs = Preferences::from_toml(
            r#"
            url = "https://jss.example.com:8443"
            username = "api"
            password = "hunter2"
            "#,
        )
        .unwrap();
        assert_eq!(prefs.url, "https://jss.example.com:8443");
        assert!(prefs.ssl_verify);
        assert_eq!(prefs.keep_versions, DEFAULT_KEEP_VERSIONS);
        assert_eq!(prefs.stale_days, DEFAULT_STALE_DAYS);
    }

    #[test]
    fn test_parse_full_preferences() {
        let prefs = Preferences::from_toml(
            r#"
            url = "https://jss.example.com:8443"
            username = "api"
            password = "hunter2"
            ssl_verify = false
            keep_versions = 2
            stale_days = 30
            "#,
        )
        .unwrap();
        assert!(!prefs.ssl_verify);
        assert_eq!(prefs.keep_versions, 2);
        assert_eq!(prefs.stale_days, 30);
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        let result = Preferences::from_toml("url = \"https://jss.example.com\"");
        assert!(matches!(result, Err(SpruceError::Config(_))));
    }
}
