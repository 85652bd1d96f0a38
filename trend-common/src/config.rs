//! Service configuration loading and data folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// TOML service configuration for the trend engine
///
/// All fields are optional; missing values fall back to environment
/// variables and then compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the schema JSON, dataset, and reference dataset
    pub data_dir: Option<String>,
    /// Socket address the HTTP server binds to
    pub bind_addr: Option<String>,
    /// Schema JSON filename within the data folder
    pub schema_file: Option<String>,
    /// Optional folder of static front-end assets to serve
    pub static_assets: Option<String>,
}

/// Load and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Data folder resolution priority order:
/// 1. Environment variable (highest priority)
/// 2. TOML config file
/// 3. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(env_var_name: &str, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        debug!(source = "env", %path, "resolved data folder");
        return PathBuf::from(path);
    }

    // Priority 2: TOML config file
    if let Some(path) = &toml_config.data_dir {
        debug!(source = "toml", %path, "resolved data folder");
        return PathBuf::from(path);
    }

    // Priority 3: OS-dependent compiled default
    default_data_dir()
}

/// Get default configuration file path for the platform
pub fn default_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/trend/config.toml first, then /etc/trend/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("trend").join("config.toml"));
        let system_config = PathBuf::from("/etc/trend/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("trend").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// Get OS-dependent default data folder path
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("trend"))
        .unwrap_or_else(|| PathBuf::from("./trend_data"))
}
