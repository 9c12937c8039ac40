//! Renderer configuration.
//!
//! Loaded once at startup from TOML. Every key is optional:
//!
//! ```toml
//! width = 128
//! height = 128
//! fps = 30
//! background = "black"   # or "#102030", [16, 32, 48], or "none" for trails
//! title = "liveloop"
//! scale = 4              # window pixels per surface pixel
//! ```

use std::path::Path;

use liveloop_core::color::{self, Color};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Highest frame rate the pacer will accept.
pub const MAX_FPS: u32 = 1000;

/// Largest surface the renderer will allocate, in pixels (4096 x 4096).
pub const MAX_PIXELS: u64 = 1 << 24;

/// Construction-time options for a [`ThreadedRenderer`](crate::ThreadedRenderer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Frame rate cap.
    pub fps: u32,
    /// Clear color; `None` skips the clear and leaves trails.
    #[serde(with = "color::optional")]
    pub background: Option<Color>,
    /// Window title.
    pub title: String,
    /// Window pixels per surface pixel. Ignored by headless displays.
    pub scale: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            fps: 30,
            background: Some(Color::BLACK),
            title: "liveloop".to_owned(),
            scale: 4,
        }
    }
}

impl RendererConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// as [`RendererConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "surface size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        let pixels = u64::from(self.width) * u64::from(self.height);
        if pixels > MAX_PIXELS {
            return Err(ConfigError::Invalid(format!(
                "surface of {}x{} exceeds {MAX_PIXELS} pixels",
                self.width, self.height
            )));
        }
        validate_fps(self.fps)?;
        if self.scale == 0 {
            return Err(ConfigError::Invalid("scale must be at least 1".to_owned()));
        }
        Ok(())
    }

    /// Surface size as `(width, height)`.
    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Checks a frame rate is within `1..=MAX_FPS`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] otherwise.
pub fn validate_fps(fps: u32) -> Result<(), ConfigError> {
    if fps == 0 || fps > MAX_FPS {
        return Err(ConfigError::Invalid(format!(
            "fps must be within 1..={MAX_FPS}, got {fps}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.size(), (128, 128));
        assert_eq!(config.fps, 30);
        assert_eq!(config.background, Some(Color::BLACK));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(RendererConfig::from_toml_str("").unwrap(), RendererConfig::default());
    }

    #[test]
    fn test_background_none_means_trails() {
        let config = RendererConfig::from_toml_str("background = \"none\"").unwrap();
        assert_eq!(config.background, None);
    }

    #[test]
    fn test_background_forms() {
        let config = RendererConfig::from_toml_str("background = [1, 2, 3]\nfps = 60").unwrap();
        assert_eq!(config.background, Some(Color::rgb(1, 2, 3)));
        assert_eq!(config.fps, 60);

        let config = RendererConfig::from_toml_str("background = \"#ffffff\"").unwrap();
        assert_eq!(config.background, Some(Color::WHITE));
    }

    #[test]
    fn test_rejects_zero_fps() {
        assert!(matches!(
            RendererConfig::from_toml_str("fps = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_zero_size() {
        assert!(matches!(
            RendererConfig::from_toml_str("width = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_surface() {
        assert!(matches!(
            RendererConfig::from_toml_str("width = 100000\nheight = 100000"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(RendererConfig::from_toml_str("width = 4096\nheight = 4096").is_ok());
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_colors() {
        assert!(matches!(
            RendererConfig::from_toml_str("colour = \"red\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RendererConfig::from_toml_str("background = \"chartreuse-ish\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = RendererConfig::from_toml_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = RendererConfig {
            background: None,
            ..RendererConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("background = \"none\""));
        assert_eq!(RendererConfig::from_toml_str(&text).unwrap(), config);
    }
}
