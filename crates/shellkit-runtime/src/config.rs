#![forbid(unsafe_code)]

//! Shell configuration as data.
//!
//! Captures every tunable of the panel controller and the URL synchroniser
//! as a single [`ShellConfig`] that can be loaded from TOML or JSON at
//! startup.
//!
//! # Loading
//!
//! ```toml
//! # shellkit.toml
//! [panel]
//! storage_key = "acme.right-panel.collapsed"
//! toggle_shortcut = "Shift+Alt+R"
//!
//! [panel.breakpoints]
//! mobile = 768
//! tablet = 1024
//!
//! [sync]
//! initiative_routes = ["/board", "/tasks"]
//! ```
//!
//! ```rust,ignore
//! let config = ShellConfig::from_toml_file("shellkit.toml")?;
//! let config = ShellConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! `ShellConfig::default()` is the stock shell: 768/1024 breakpoints,
//! `Shift+Alt+R`, persistence on, `project` synced everywhere and
//! `initiative` synced on `/board` and `/tasks`.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use shellkit_core::keybinding::DEFAULT_PANEL_TOGGLE;
use shellkit_core::{Breakpoints, Shortcut};

use crate::location::{RouteScope, RouteSet};

/// Default local-storage key for the panel's collapsed preference.
pub const DEFAULT_STORAGE_KEY: &str = "shellkit.right-panel.collapsed";

/// Default query parameter mirroring the project selection.
pub const DEFAULT_PROJECT_PARAM: &str = "project";

/// Default query parameter mirroring the initiative filter.
pub const DEFAULT_INITIATIVE_PARAM: &str = "initiative";

/// Routes on which the initiative parameter is synced by default.
pub const DEFAULT_INITIATIVE_ROUTES: &[&str] = &["/board", "/tasks"];

// ---------------------------------------------------------------------------
// Top-level ShellConfig
// ---------------------------------------------------------------------------

/// Top-level shell configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ShellConfig {
    /// Side-panel behaviour.
    pub panel: PanelConfig,

    /// URL/store synchronisation.
    pub sync: SyncConfig,
}

impl ShellConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.panel.validate().into_iter().map(|e| format!("panel.{e}")));
        errors.extend(self.sync.validate().into_iter().map(|e| format!("sync.{e}")));
        errors
    }

    /// Validate and convert the error list into a [`ConfigError`].
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// Side-panel controller settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct PanelConfig {
    /// Preference-store key holding `"true"` when the panel is collapsed.
    pub storage_key: String,

    /// Remember the open/closed preference across reloads.
    /// When `false` the controller starts in ephemeral mode.
    pub persist: bool,

    /// Viewport thresholds.
    pub breakpoints: Breakpoints,

    /// Keyboard shortcut toggling the panel.
    pub toggle_shortcut: Shortcut,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            persist: true,
            breakpoints: Breakpoints::default(),
            toggle_shortcut: DEFAULT_PANEL_TOGGLE,
        }
    }
}

impl PanelConfig {
    /// Replace the toggle shortcut from its textual form.
    pub fn with_toggle_shortcut(
        mut self,
        shortcut: &str,
    ) -> Result<Self, shellkit_core::ShortcutParseError> {
        self.toggle_shortcut = shortcut.parse()?;
        Ok(self)
    }

    /// Validate panel settings.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.persist && self.storage_key.trim().is_empty() {
            errors.push("storage_key must not be empty when persist is enabled".to_string());
        }
        errors.extend(self.breakpoints.validate());
        if self.toggle_shortcut.modifiers().is_empty() {
            errors.push(format!(
                "toggle_shortcut ({}) needs at least one modifier",
                self.toggle_shortcut
            ));
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// URL/store synchroniser settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SyncConfig {
    /// Query parameter mirroring the project store. Synced on every route.
    pub project_param: String,

    /// Query parameter mirroring the initiative store.
    pub initiative_param: String,

    /// Route prefixes on which the initiative parameter is synced.
    pub initiative_routes: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            project_param: DEFAULT_PROJECT_PARAM.to_string(),
            initiative_param: DEFAULT_INITIATIVE_PARAM.to_string(),
            initiative_routes: DEFAULT_INITIATIVE_ROUTES
                .iter()
                .map(|r| (*r).to_string())
                .collect(),
        }
    }
}

impl SyncConfig {
    /// Scope of the initiative parameter.
    #[must_use]
    pub fn initiative_scope(&self) -> RouteScope {
        RouteScope::Routes(RouteSet::new(&self.initiative_routes))
    }

    /// Validate sync settings.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.project_param.is_empty() {
            errors.push("project_param must not be empty".to_string());
        }
        if self.initiative_param.is_empty() {
            errors.push("initiative_param must not be empty".to_string());
        }
        if !self.project_param.is_empty() && self.project_param == self.initiative_param {
            errors.push(format!(
                "project_param and initiative_param must differ (both {:?})",
                self.project_param
            ));
        }
        for route in &self.initiative_routes {
            if !route.starts_with('/') {
                errors.push(format!("initiative_routes entry {route:?} must start with '/'"));
            }
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from loading or validating shell configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use shellkit_core::Modifiers;

    #[test]
    fn defaults_are_valid() {
        let config = ShellConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.panel.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.panel.breakpoints, Breakpoints::new(768, 1024));
        assert_eq!(config.panel.toggle_shortcut.to_string(), "Shift+Alt+R");
        assert_eq!(config.sync.project_param, "project");
        assert_eq!(config.sync.initiative_param, "initiative");
    }

    #[test]
    fn initiative_scope_uses_routes() {
        let scope = SyncConfig::default().initiative_scope();
        assert!(scope.applies_to("/board"));
        assert!(scope.applies_to("/tasks/7"));
        assert!(!scope.applies_to("/"));
        assert!(!scope.applies_to("/settings"));
    }

    #[test]
    fn validation_collects_prefixed_errors() {
        let mut config = ShellConfig::default();
        config.panel.breakpoints = Breakpoints::new(1200, 1024);
        config.panel.toggle_shortcut = Shortcut::new('r', Modifiers::NONE);
        config.sync.initiative_param = "project".into();
        config.sync.initiative_routes = vec!["board".into()];

        let errors = config.validate();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().all(|e| e.starts_with("panel.") || e.starts_with("sync.")));
        assert!(errors.iter().any(|e| e.contains("breakpoints.mobile")));
        assert!(errors.iter().any(|e| e.contains("must differ")));
    }

    #[test]
    fn empty_storage_key_is_fine_without_persistence() {
        let mut panel = PanelConfig {
            storage_key: String::new(),
            ..PanelConfig::default()
        };
        assert_eq!(panel.validate().len(), 1);
        panel.persist = false;
        assert!(panel.validate().is_empty());
    }

    #[test]
    fn validated_wraps_errors() {
        let mut config = ShellConfig::default();
        config.sync.project_param.clear();
        match config.validated() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors, vec!["sync.project_param must not be empty".to_string()]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(ShellConfig::default().validated().is_ok());
    }

    #[test]
    fn shortcut_override() {
        let panel = PanelConfig::default().with_toggle_shortcut("Ctrl+Shift+P").unwrap();
        assert_eq!(panel.toggle_shortcut, Shortcut::new('p', Modifiers::CTRL | Modifiers::SHIFT));
        assert!(PanelConfig::default().with_toggle_shortcut("Shift+").is_err());
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_partial_override_keeps_defaults() {
        let config = ShellConfig::from_toml_str(
            r#"
            [panel]
            toggle_shortcut = "Ctrl+Alt+P"

            [panel.breakpoints]
            tablet = 1280

            [sync]
            initiative_routes = ["/roadmap"]
            "#,
        )
        .unwrap();
        assert_eq!(config.panel.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.panel.breakpoints, Breakpoints::new(768, 1280));
        assert_eq!(config.panel.toggle_shortcut.to_string(), "Alt+Ctrl+P");
        assert_eq!(config.sync.project_param, "project");
        assert_eq!(config.sync.initiative_routes, vec!["/roadmap".to_string()]);
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_rejects_bad_shortcut() {
        let err = ShellConfig::from_json_str(r#"{"panel": {"toggle_shortcut": "Hyper+R"}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("unknown modifier"));
    }
}
