use super::{default_interval, default_startup_delay, default_theme, BlockConfig, Config, HeaderConfig};
use crate::bar::RenderOptions;

/// The bar shown when no configuration file exists.
pub fn default_blocks() -> Vec<BlockConfig> {
    vec![
        BlockConfig::new("clock"),
        BlockConfig::new("cpu").every(2),
        BlockConfig::new("memory").every(2),
        BlockConfig::new("loadavg").every(5),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            theme: default_theme(),
            plugin_dir: crate::utils::lib_path(),
            fetch_timeout: None,
            startup_delay_ms: default_startup_delay(),
            header: HeaderConfig::default(),
            render: RenderOptions::default(),
            blocks: Some(default_blocks()),
        }
    }
}
