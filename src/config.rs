use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::connection::Connection;
use crate::error::{SeedError, SeedResult};

const APP_NAME: &str = "crm-seed";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub conn: Vec<Connection>,
}

impl Config {
    /// Load `config.yaml` from the app config directory. A missing file is an empty config.
    pub fn new() -> SeedResult<Self> {
        let path = Self::app_config_dir()?.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> SeedResult<Self> {
        let data = fs::read(path)
            .map_err(|e| SeedError::config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&data)
            .map_err(|e| SeedError::config(format!("failed to parse YAML at {}: {e}", path.display())))
    }

    fn from_yaml(data: &[u8]) -> Result<Self, serde_yaml::Error> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_yaml::from_slice(data)
    }

    /// Return the application config directory path, creating it if missing.
    pub fn app_config_dir() -> SeedResult<PathBuf> {
        let mut path = if cfg!(target_os = "macos") {
            dirs_next::home_dir().map(|h| h.join(".config"))
        } else {
            dirs_next::config_dir()
        }
        .ok_or_else(|| SeedError::config("failed to find os config dir."))?;

        path.push(APP_NAME);
        fs::create_dir_all(&path).map_err(|e| {
            SeedError::config(format!("failed to create {}: {e}", path.display()))
        })?;
        Ok(path)
    }
}
