use crate::config::Config;
use crate::error::ConfigError;
use crate::utils::config_path;
use log::{debug, info};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const CONFIG_ENV: &str = "STATUSBLOCKS_CONFIG";
pub const THEME_ENV: &str = "STATUSBLOCKS_THEME";
pub const PLUGIN_DIR_ENV: &str = "STATUSBLOCKS_PLUGIN_DIR";

/// Load configuration with priority: CLI path > `$STATUSBLOCKS_CONFIG` >
/// config files > defaults. Environment overrides are applied last.
pub async fn load_config(config_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let explicit = config_path.or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

    let mut config = match explicit {
        Some(path) => load_config_file(&path).await?,
        None => load_config_from_default_locations().await?,
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

async fn load_config_from_default_locations() -> Result<Config, ConfigError> {
    for path in get_config_search_paths() {
        if path.is_file() {
            return load_config_file(&path).await;
        }
        debug!("No configuration at {}", path.display());
    }

    info!("No configuration file found, using the default bar");
    Ok(Config::default())
}

/// Places searched for a configuration file, in order.
pub fn get_config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("statusblocks.json")];
    if let Some(path) = config_path("config.json") {
        paths.push(path);
    }
    paths
}

pub async fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let config = parse_config(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config, serde_json::Error> {
    serde_json::from_str(content)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(theme) = env::var(THEME_ENV) {
        config.theme = theme;
    }

    if let Some(dir) = env::var_os(PLUGIN_DIR_ENV) {
        config.plugin_dir = Some(PathBuf::from(dir));
    }
}
