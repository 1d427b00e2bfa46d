use crate::error::{PainterError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_PATH_CACHE_LIMIT: usize = 10_000;
pub const DEFAULT_SIMPLIFY_THRESHOLD: f32 = 1.0;

/// Renderer settings, usually loaded from a JSON file next to the host.
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub depth_test: bool,
    pub random_z: bool,
    pub random_z_seed: u64,
    pub z_factor: f32,
    pub simplify_threshold: f32,
    pub path_cache_limit: usize,
    /// CSS color; white when unset.
    pub background: Option<String>,
    /// Overrides the canvas device pixel ratio.
    pub device_pixel_ratio: Option<f64>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            depth_test: false,
            random_z: false,
            random_z_seed: 0x5EED,
            z_factor: 0.0,
            simplify_threshold: DEFAULT_SIMPLIFY_THRESHOLD,
            path_cache_limit: DEFAULT_PATH_CACHE_LIMIT,
            background: None,
            device_pixel_ratio: None,
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: RendererConfig =
            serde_json::from_str(text).map_err(|e| PainterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| PainterError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.simplify_threshold >= 0.0) {
            return Err(PainterError::Config(
                "simplify_threshold must be a non-negative number".to_string(),
            ));
        }
        if self.path_cache_limit == 0 {
            return Err(PainterError::Config(
                "path_cache_limit must be at least 1".to_string(),
            ));
        }
        if let Some(ratio) = self.device_pixel_ratio {
            if !(ratio > 0.0) {
                return Err(PainterError::Config(
                    "device_pixel_ratio must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}
