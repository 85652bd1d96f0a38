//! Engine settings resolution
//!
//! Every setting resolves with environment variable → TOML config file →
//! compiled default priority.

use std::path::PathBuf;

use trend_common::config::{self, TomlConfig};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5810";
pub const DEFAULT_SCHEMA_FILE: &str = "trajectory.json";

/// Resolved settings the engine starts with
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Folder holding the schema, dataset, and reference dataset files
    pub data_dir: PathBuf,
    /// Schema JSON filename within the data folder
    pub schema_file: String,
    pub bind_addr: String,
    /// Optional folder of static front-end assets
    pub static_assets: Option<PathBuf>,
}

impl EngineSettings {
    /// Resolve settings from the environment and the platform config file
    pub fn resolve() -> Self {
        let toml_config = config::default_config_file()
            .and_then(|path| config::read_toml_config(&path))
            .unwrap_or_default();
        Self::from_toml(&toml_config)
    }

    /// Resolve settings against an explicit TOML config
    pub fn from_toml(toml_config: &TomlConfig) -> Self {
        let data_dir = config::resolve_data_dir("TREND_DATA_DIR", toml_config);
        let schema_file = std::env::var("TREND_SCHEMA_FILE")
            .ok()
            .or_else(|| toml_config.schema_file.clone())
            .unwrap_or_else(|| DEFAULT_SCHEMA_FILE.to_string());
        let bind_addr = std::env::var("TREND_BIND_ADDR")
            .ok()
            .or_else(|| toml_config.bind_addr.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let static_assets = std::env::var("TREND_STATIC_ASSETS")
            .ok()
            .or_else(|| toml_config.static_assets.clone())
            .map(PathBuf::from);

        Self {
            data_dir,
            schema_file,
            bind_addr,
            static_assets,
        }
    }

    /// Full path of the schema JSON file
    pub fn schema_path(&self) -> PathBuf {
        self.data_dir.join(&self.schema_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_toml_or_env() {
        let settings = EngineSettings::from_toml(&TomlConfig::default());
        assert_eq!(settings.schema_file, DEFAULT_SCHEMA_FILE);
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert!(settings.static_assets.is_none());
    }

    #[test]
    fn test_toml_values_override_defaults() {
        let toml_config = TomlConfig {
            data_dir: Some("/srv/trend".to_string()),
            bind_addr: Some("0.0.0.0:8080".to_string()),
            schema_file: Some("custom.json".to_string()),
            static_assets: Some("/srv/trend/ui".to_string()),
        };
        let settings = EngineSettings::from_toml(&toml_config);
        assert_eq!(settings.data_dir, PathBuf::from("/srv/trend"));
        assert_eq!(settings.bind_addr, "0.0.0.0:8080");
        assert_eq!(settings.schema_path(), PathBuf::from("/srv/trend/custom.json"));
        assert_eq!(settings.static_assets, Some(PathBuf::from("/srv/trend/ui")));
    }
}
