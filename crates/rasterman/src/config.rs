//! Panel configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration:
//!
//! ```toml
//! frame_interval_ms = 16
//!
//! [debounce]
//! wait_ms = 80
//! leading = false
//! trailing = true
//! # max_wait_ms = 250
//!
//! [canvas]
//! width = 300
//! height = 300
//! background = "#828282"
//! ```

use std::path::Path;
use std::time::Duration;

use rasterman_core::DebounceConfig;
use rasterman_core::logging::targets;
use rasterman_render::{CanvasConfig, Color};
use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};

/// Top-level panel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelConfig {
    /// Slider debounce settings, shared by every slider.
    pub debounce: DebounceSettings,
    /// Canvas geometry.
    pub canvas: CanvasSettings,
    /// Frame interval for the real-time event loop.
    pub frame_interval_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            debounce: DebounceSettings::default(),
            canvas: CanvasSettings::default(),
            frame_interval_ms: 16,
        }
    }
}

impl PanelConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PanelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(target: targets::CONFIG, path = %path.display(), "loaded panel config");
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        self.debounce
            .to_debounce_config()
            .validate()
            .map_err(|e| PanelError::InvalidValue {
                field: "debounce.max_wait_ms",
                reason: e.to_string(),
            })?;
        self.canvas.to_canvas_config()?;
        if self.frame_interval_ms == 0 {
            return Err(PanelError::InvalidValue {
                field: "frame_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// The frame interval as a duration.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Debounce settings in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebounceSettings {
    /// Settling window.
    pub wait_ms: u64,
    /// Invoke on the first call of a burst.
    pub leading: bool,
    /// Invoke when a burst settles.
    pub trailing: bool,
    /// Upper bound on how long a burst can delay invocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_ms: Option<u64>,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            wait_ms: 80,
            leading: false,
            trailing: true,
            max_wait_ms: None,
        }
    }
}

impl DebounceSettings {
    /// The equivalent coalescer configuration.
    pub fn to_debounce_config(&self) -> DebounceConfig {
        let config = DebounceConfig::new(Duration::from_millis(self.wait_ms))
            .leading(self.leading)
            .trailing(self.trailing);
        match self.max_wait_ms {
            Some(max_wait) => config.max_wait(Duration::from_millis(max_wait)),
            None => config,
        }
    }
}

/// Canvas settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasSettings {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Background color as a hex string.
    pub background: String,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            background: Color::CANVAS_GRAY.to_string(),
        }
    }
}

impl CanvasSettings {
    /// The equivalent engine canvas configuration.
    pub fn to_canvas_config(&self) -> Result<CanvasConfig> {
        if self.width == 0 || self.height == 0 {
            return Err(PanelError::InvalidValue {
                field: "canvas",
                reason: format!("dimensions {}x{} must be non-zero", self.width, self.height),
            });
        }
        let background = Color::from_hex(&self.background).map_err(|e| PanelError::InvalidValue {
            field: "canvas.background",
            reason: e.to_string(),
        })?;
        Ok(CanvasConfig::new(self.width, self.height).with_background(background))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = PanelConfig::from_toml_str("").unwrap();
        assert_eq!(config, PanelConfig::default());
        assert_eq!(config.debounce.wait_ms, 80);
        assert!(!config.debounce.leading);
        assert!(config.debounce.trailing);
        assert_eq!(config.canvas.background, "#828282");
        assert_eq!(config.frame_interval(), Duration::from_millis(16));
    }

    #[test]
    fn test_partial_document() {
        let config = PanelConfig::from_toml_str(
            r#"
            [debounce]
            wait_ms = 50
            max_wait_ms = 200
            "#,
        )
        .unwrap();
        assert_eq!(config.debounce.wait_ms, 50);
        assert_eq!(config.debounce.max_wait_ms, Some(200));
        assert!(config.debounce.trailing);

        let debounce = config.debounce.to_debounce_config();
        assert_eq!(debounce.max_wait, Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_rejects_max_wait_below_wait() {
        let err = PanelConfig::from_toml_str("[debounce]\nwait_ms = 100\nmax_wait_ms = 10\n")
            .unwrap_err();
        assert!(matches!(
            err,
            PanelError::InvalidValue { field: "debounce.max_wait_ms", .. }
        ));
    }

    #[test]
    fn test_rejects_bad_canvas() {
        assert!(matches!(
            PanelConfig::from_toml_str("[canvas]\nbackground = \"grey\"\n"),
            Err(PanelError::InvalidValue { field: "canvas.background", .. })
        ));
        assert!(matches!(
            PanelConfig::from_toml_str("[canvas]\nwidth = 0\n"),
            Err(PanelError::InvalidValue { field: "canvas", .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(matches!(
            PanelConfig::from_toml_str("[debounce]\nwiat_ms = 10\n"),
            Err(PanelError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "frame_interval_ms = 8\n[canvas]\nwidth = 640\nheight = 380").unwrap();

        let config = PanelConfig::load(file.path()).unwrap();
        assert_eq!(config.frame_interval_ms, 8);
        assert_eq!(config.canvas.width, 640);
        assert_eq!(config.canvas.height, 380);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PanelConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, PanelError::Io { .. }));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = PanelConfig::default();
        config.debounce.max_wait_ms = Some(300);
        let text = config.to_toml_string().unwrap();
        assert_eq!(PanelConfig::from_toml_str(&text).unwrap(), config);
    }
}
