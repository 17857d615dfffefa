use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::tracker::DEFAULT_TOLERANCE;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// WebSocket endpoint subscribers connect to.
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            path: "/ws".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub landmark_tolerance: f64,
    /// Events buffered between the frame thread and the broadcaster.
    pub handoff_capacity: usize,
    /// Messages queued per subscriber before it is considered dead.
    pub subscriber_backlog: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            landmark_tolerance: DEFAULT_TOLERANCE,
            handoff_capacity: 64,
            subscriber_backlog: 32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    pub socket: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub feed: FeedConfig,
}

fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot resolve home directory"))?;
    Ok(dirs.home_dir().join(".config").join("gesturecast"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn default_config_text() -> &'static str {
    include_str!("../config/default.toml")
}

impl AppConfig {
    /// Loads `~/.config/gesturecast/config.toml`, installing the built-in
    /// default on first run.
    pub fn load_or_install_default() -> Result<Self> {
        let path = default_config_path()?;
        if !path.exists() {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&path, default_config_text())?;
            info!("installed default config at {}", path.display());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        Self::parse(&txt).map_err(|e| anyhow!("{}: {e}", path.display()))
    }

    pub fn parse(txt: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(txt).map_err(|e| anyhow!("failed to parse: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let tol = self.pipeline.landmark_tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(anyhow!(
                "pipeline.landmark_tolerance must be a non-negative number"
            ));
        }
        if self.pipeline.handoff_capacity == 0 || self.pipeline.subscriber_backlog == 0 {
            return Err(anyhow!("pipeline capacities must be positive"));
        }
        if self.server.bind.trim().is_empty() {
            return Err(anyhow!("server.bind must not be empty"));
        }
        if !self.server.path.starts_with('/') || self.server.path.len() < 2 {
            return Err(anyhow!(
                "server.path must start with '/' and name an endpoint, got '{}'",
                self.server.path
            ));
        }
        if self.server.path == crate::ipc::STATUS_PATH {
            return Err(anyhow!(
                "server.path '{}' is reserved",
                crate::ipc::STATUS_PATH
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
