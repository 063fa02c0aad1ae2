//! Configuration settings for audiocut.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub audio: AudioSettings,
    pub tools: ToolSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory that receives finished audio files.
    pub output_dir: String,
    /// Scratch directory for segment downloads. Removed on exit.
    pub temp_dir: String,
    /// Log level used when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            temp_dir: "temp".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Audio selection and transcoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// yt-dlp format selector.
    pub format: String,
    /// Target codec, also used as the output file extension.
    pub codec: String,
    /// Target bitrate in kbit/s.
    pub quality: String,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            format: "bestaudio/best".to_string(),
            codec: "mp3".to_string(),
            quality: "192".to_string(),
        }
    }
}

/// External tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// yt-dlp executable name or path.
    pub ytdlp: String,
    /// ffmpeg executable name or path.
    pub ffmpeg: String,
    /// Bundled toolchain directory searched after PATH.
    /// Defaults to `ffmpeg/bin` next to the executable.
    pub bundled_dir: Option<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ytdlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            bundled_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AudiocutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("audiocut")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the bundled toolchain directory, if one can be determined.
    pub fn bundled_dir(&self) -> Option<PathBuf> {
        match &self.tools.bundled_dir {
            Some(dir) => Some(Self::expand_path(dir)),
            None => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|p| p.join("ffmpeg").join("bin"))),
        }
    }
}
