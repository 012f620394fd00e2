use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    picture::{Color, Size},
};

/// Main configuration for the composition player
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Desired transport state
    pub playback: PlaybackIntent,

    /// Output surface settings
    pub render: RenderConfig,

    /// Software extractor settings
    pub extractor: ExtractorConfig,
}

impl PlayerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: PlayerConfig = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.render.validate()?;
        self.extractor.validate()?;
        Ok(())
    }
}

/// Caller-declared playback state, applied to whichever extractor is live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackIntent {
    /// Start playing as soon as a new extractor is created
    pub auto_play: bool,

    /// Restart from the beginning when the end is reached
    pub is_looping: bool,
}

/// Output surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// How often the driver samples the playback clock (frames per second)
    pub fps: f64,

    /// Color under everything the draw routine paints
    pub background: Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30.0,
            background: [0, 0, 0, 255],
        }
    }
}

impl RenderConfig {
    /// Output size as a shared-value payload
    pub fn size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "render.size".to_string(),
                value: format!("{}x{}", self.width, self.height)
            }.into());
        }

        if !self.fps.is_finite() || self.fps <= 0.0 || self.fps > 240.0 {
            return Err(ConfigError::InvalidValue {
                key: "render.fps".to_string(),
                value: self.fps.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Software extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Frame width for items without a known resolution
    pub frame_width: u32,

    /// Frame height for items without a known resolution
    pub frame_height: u32,

    /// Prepare extractors on a dedicated render thread instead of the caller's thread
    pub render_thread: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            frame_width: 320,
            frame_height: 180,
            render_thread: true,
        }
    }
}

impl ExtractorConfig {
    fn validate(&self) -> Result<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "extractor.frame_size".to_string(),
                value: format!("{}x{}", self.frame_width, self.frame_height)
            }.into());
        }

        Ok(())
    }
}
