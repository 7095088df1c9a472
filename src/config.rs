use crate::interpolation::{
    SpatialInterpolator, DEFAULT_KERNEL_SIZE, DEFAULT_MAX_DISTANCE, DEFAULT_POWER,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding measurements and the coordinate mapping
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            database: "./sigmap.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Grid columns
    pub width: usize,
    /// Grid rows
    pub height: usize,
    /// IDW power: higher values make estimates more local
    pub power: f64,
    /// Samples at or beyond this normalized distance are ignored
    pub max_distance: f64,
    /// Run a Gaussian blur over the grid
    pub smoothing: bool,
    pub kernel_size: i32,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        HeatmapConfig {
            width: 50,
            height: 50,
            power: DEFAULT_POWER,
            max_distance: DEFAULT_MAX_DISTANCE,
            smoothing: true,
            kernel_size: DEFAULT_KERNEL_SIZE,
        }
    }
}

impl HeatmapConfig {
    pub fn interpolator(&self) -> SpatialInterpolator {
        SpatialInterpolator::new(self.power, self.max_distance)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.database, "./sigmap.db");
        assert_eq!(config.heatmap.width, 50);
        assert_eq!(config.heatmap.kernel_size, 3);
        assert_eq!(config.heatmap.interpolator(), SpatialInterpolator::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"heatmap": {"width": 80, "smoothing": false}}"#).unwrap();
        assert_eq!(config.heatmap.width, 80);
        assert_eq!(config.heatmap.height, 50);
        assert!(!config.heatmap.smoothing);
        assert_eq!(config.storage.database, "./sigmap.db");
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("sigmap-config-{}.json", std::process::id()));
        let mut config = Config::default();
        config.heatmap.power = 3.0;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.heatmap.power, 3.0);
        let _ = fs::remove_file(&path);
    }
}
