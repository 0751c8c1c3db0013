//! Annotation settings
//!
//! Loaded from a TOML file by hosts and the CLI; `Default` is a working
//! local-only setup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reconcile::ReconcileStrategy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Features the reader is allowed to use
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderRights {
    pub enable_annotations: bool,
}

impl Default for ReaderRights {
    fn default() -> Self {
        Self {
            enable_annotations: true,
        }
    }
}

/// Sidebar presentation flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct UiOptions {
    /// Alternate (material) chrome is active
    pub material: bool,
    /// The side navigation is expanded into edit mode
    pub side_nav_expanded: bool,
}

impl UiOptions {
    /// Delete actions show in edit mode, or always outside the alternate chrome
    pub fn allows_delete(&self) -> bool {
        (self.material && self.side_nav_expanded) || !self.material
    }
}

/// Remote annotation API endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteSettings {
    /// Server URL (e.g., "https://reader.example.org/api")
    pub base_url: String,
    /// Path for creating annotations; absent means no remote add
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_path: Option<String>,
    /// Path prefix for deleting annotations; absent means no remote delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_path: Option<String>,
    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    60
}

impl RemoteSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            add_path: Some("/annotations".to_string()),
            delete_path: Some("/annotations".to_string()),
            token: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnotationSettings {
    pub rights: ReaderRights,
    /// Capture color restored after every redraw
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_annotation_color: Option<String>,
    pub resize_debounce_ms: u64,
    pub initial_draw_delay_ms: u64,
    pub strategy: ReconcileStrategy,
    pub ui: UiOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSettings>,
    /// Local JSON store; defaults to the user data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            rights: ReaderRights::default(),
            initial_annotation_color: None,
            resize_debounce_ms: 10,
            initial_draw_delay_ms: 300,
            strategy: ReconcileStrategy::Full,
            ui: UiOptions::default(),
            remote: None,
            store_path: None,
        }
    }
}

impl AnnotationSettings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let settings = Self::from_toml(&content)?;
        log::debug!("Loaded annotation settings from {:?}", path);
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn initial_draw_delay(&self) -> Duration {
        Duration::from_millis(self.initial_draw_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = AnnotationSettings::default();
        assert!(settings.rights.enable_annotations);
        assert_eq!(settings.resize_debounce(), Duration::from_millis(10));
        assert_eq!(settings.strategy, ReconcileStrategy::Full);
        assert!(settings.remote.is_none());
    }

    #[test]
    fn test_parse_full_file() {
        let settings = AnnotationSettings::from_toml(
            r##"
            initial_annotation_color = "#ff0000"
            strategy = "incremental"
            resize_debounce_ms = 25

            [rights]
            enable_annotations = false

            [ui]
            material = true

            [remote]
            base_url = "https://reader.example.org/api"
            add_path = "/highlights"
            "##,
        )
        .unwrap();

        assert_eq!(settings.initial_annotation_color.as_deref(), Some("#ff0000"));
        assert_eq!(settings.strategy, ReconcileStrategy::Incremental);
        assert_eq!(settings.resize_debounce_ms, 25);
        assert_eq!(settings.initial_draw_delay_ms, 300);
        assert!(!settings.rights.enable_annotations);
        assert!(settings.ui.material);

        let remote = settings.remote.unwrap();
        assert_eq!(remote.add_path.as_deref(), Some("/highlights"));
        assert_eq!(remote.delete_path, None);
        assert_eq!(remote.request_timeout_secs, 60);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("annotations.toml");
        fs::write(&path, "initial_draw_delay_ms = 0\n").unwrap();

        let settings = AnnotationSettings::load(&path).unwrap();
        assert_eq!(settings.initial_draw_delay(), Duration::ZERO);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = AnnotationSettings::from_toml("strategy = [").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_delete_visibility() {
        let mut ui = UiOptions::default();
        assert!(ui.allows_delete());
        ui.material = true;
        assert!(!ui.allows_delete());
        ui.side_nav_expanded = true;
        assert!(ui.allows_delete());
    }
}
