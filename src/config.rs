use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Hearthview".to_string(), width: 1280, height: 720, vsync: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "CameraConfig::default_near")]
    pub near: f32,
    #[serde(default = "CameraConfig::default_far")]
    pub far: f32,
    /// Exponential damping rate for orbit input, higher snaps faster.
    #[serde(default = "CameraConfig::default_damping")]
    pub damping: f32,
}

impl CameraConfig {
    const fn default_fov_degrees() -> f32 {
        55.0
    }

    const fn default_near() -> f32 {
        0.1
    }

    const fn default_far() -> f32 {
        500.0
    }

    const fn default_damping() -> f32 {
        8.0
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: Self::default_fov_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
            damping: Self::default_damping(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "ViewerConfig::default_models_root")]
    pub models_root: String,
    #[serde(default = "ViewerConfig::default_room_scale")]
    pub room_scale: f32,
    #[serde(default = "ViewerConfig::default_highlight_emissive")]
    pub highlight_emissive: [f32; 3],
}

impl ViewerConfig {
    fn default_models_root() -> String {
        "assets/models".to_string()
    }

    const fn default_room_scale() -> f32 {
        1.5
    }

    const fn default_highlight_emissive() -> [f32; 3] {
        [0.35, 0.28, 0.05]
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            models_root: Self::default_models_root(),
            room_scale: Self::default_room_scale(),
            highlight_emissive: Self::default_highlight_emissive(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(vsync) = overrides.vsync {
            self.window.vsync = vsync;
        }
    }
}
