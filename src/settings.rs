//! Viewer settings with persistence
//!
//! Settings are saved to `~/.config/orbit-viewer/settings.toml`

use std::fs;
use std::path::{Path, PathBuf};

use orbit_camera::CameraConfig;
use orbit_render::RenderConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All viewer settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub window: WindowSettings,
    pub model: ModelSettings,
    pub render: RenderConfig,
    pub camera: CameraConfig,
}

impl ViewerSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("orbit-viewer"))
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Whether a settings file is already on disk
    pub fn file_exists() -> bool {
        Self::settings_path().is_some_and(|p| p.exists())
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        Self::load_from(&path)
    }

    pub(crate) fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::settings_path() else {
            anyhow::bail!("Could not determine config directory");
        };

        self.save_to(&path)
    }

    pub(crate) fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        // Create config directory if it doesn't exist
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Apply command-line overrides. The first argument replaces the model path.
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator<Item = String>,
    {
        if let Some(path) = args.into_iter().next() {
            self.model.path = PathBuf::from(path);
        }
    }
}

/// Window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    /// Initial inner width in logical pixels
    pub width: u32,
    /// Initial inner height in logical pixels
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Orbit Viewer".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Which model to show and where its textures live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub path: PathBuf,
    /// Texture directory; defaults to the model's own directory
    pub texture_dir: Option<PathBuf>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("assets/model.gltf"),
            texture_dir: None,
        }
    }
}

impl ModelSettings {
    pub fn texture_dir(&self) -> PathBuf {
        match &self.texture_dir {
            Some(dir) => dir.clone(),
            None => self
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }
}
