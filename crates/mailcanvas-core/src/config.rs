use crate::controls::PlacementConfig;
use crate::factory::DEFAULT_MAX_COLUMNS;
use crate::geometry::Size;
use crate::hover::HoverConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Serde(serde_json::Error),
    ProjectDir,
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    pub hide_delay_ms: u64,
    pub drop_settle_ms: u64,
    pub controls_offset: f64,
    pub viewport_margin: f64,
    pub controls_width: f64,
    pub controls_height: f64,
    pub max_columns: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            hide_delay_ms: 500,
            drop_settle_ms: 300,
            controls_offset: 8.0,
            viewport_margin: 8.0,
            controls_width: 40.0,
            controls_height: 160.0,
            max_columns: DEFAULT_MAX_COLUMNS,
        }
    }
}

impl CanvasConfig {
    pub fn hover(&self) -> HoverConfig {
        HoverConfig {
            hide_delay: Duration::from_millis(self.hide_delay_ms),
            drop_settle: Duration::from_millis(self.drop_settle_ms),
        }
    }

    pub fn placement(&self) -> PlacementConfig {
        PlacementConfig {
            offset: self.controls_offset,
            margin: self.viewport_margin,
            controls: Size::new(self.controls_width, self.controls_height),
        }
    }
}

pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn default_store() -> Result<Self, ConfigError> {
        let project_dirs = ProjectDirs::from("app", "mailcanvas", "MailCanvas")
            .ok_or(ConfigError::ProjectDir)?;
        Ok(Self::new(project_dirs.config_dir().join("config.json")))
    }

    pub fn load(&self) -> Result<CanvasConfig, ConfigError> {
        if !self.config_path.exists() {
            return Ok(CanvasConfig::default());
        }
        let raw = fs::read_to_string(&self.config_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, config: &CanvasConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, data)?;
        Ok(())
    }
}
