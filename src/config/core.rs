use super::{ContextConfig, RenderConfig, WindowConfig};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{info, LevelFilter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";

/// Everything the app reads at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub window: WindowConfig,
    pub context: ContextConfig,
    pub render: RenderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            context: ContextConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads `config.toml` from the platform config directory, writing the
    /// defaults there first if it doesn't exist yet.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&default_config_path()?)
    }

    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let config = Self::default();
        let toml_content = toml::to_string_pretty(&config)?;
        std::fs::write(path, toml_content).context("Failed to write default config")?;
        info!("wrote default config to {}", path.display());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        self.log_level
            .parse()
            .with_context(|| format!("Unknown log level '{}'", self.log_level))
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "MetroManDevTeam", "gltriangle")
        .context("Couldn't determine project directory")?;
    Ok(proj_dirs.config_dir().join(CONFIG_FILE))
}
