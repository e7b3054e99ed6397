pub mod defaults;
pub mod loader;
pub mod options;

pub use defaults::*;
pub use loader::*;

use crate::bar::{Header, RenderOptions};
use crate::error::ConfigError;
use crate::registry::Registry;
use log::debug;
use options::Options;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Seconds between two frames.
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub plugin_dir: Option<PathBuf>,
    /// Upper bound in seconds for a single sensor fetch.
    #[serde(default)]
    pub fetch_timeout: Option<u64>,
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,
    #[serde(default)]
    pub header: HeaderConfig,
    #[serde(default)]
    pub render: RenderOptions,
    #[serde(default)]
    pub blocks: Option<Vec<BlockConfig>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderConfig {
    pub stop_signal: Option<i32>,
    pub cont_signal: Option<i32>,
    pub click_events: Option<bool>,
}

impl HeaderConfig {
    pub fn to_header(&self) -> Header {
        Header {
            stop_signal: self.stop_signal,
            cont_signal: self.cont_signal,
            click_events: self.click_events,
            ..Header::default()
        }
    }
}

/// One entry of the `blocks` list, as written in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    #[serde(default)]
    pub plugin: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub interval: Option<u64>,
    /// Everything else is a plugin option.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl BlockConfig {
    pub fn new(plugin: &str) -> Self {
        Self {
            plugin: Some(plugin.to_string()),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn every(mut self, seconds: u64) -> Self {
        self.interval = Some(seconds);
        self
    }

    pub fn option(mut self, name: &str, value: Value) -> Self {
        self.options.insert(name.to_string(), value);
        self
    }
}

/// A validated block, ready for [`Registry::instantiate`].
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDescriptor {
    pub plugin: String,
    pub name: String,
    pub interval: Duration,
    pub options: Options,
}

impl Config {
    pub fn frame_interval(&self) -> Result<Duration, ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::InvalidInterval {
                block: "statusline".to_string(),
                interval: 0,
            });
        }
        Ok(Duration::from_secs(self.interval))
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// Check every block against the schema of its plugin.
    ///
    /// Blocks naming an unknown plugin pass through with empty options; the
    /// registry skips them when instantiating.
    pub fn resolve_blocks(&self, registry: &Registry) -> Result<Vec<BlockDescriptor>, ConfigError> {
        let blocks = self.blocks.as_ref().ok_or(ConfigError::MissingBlocks)?;

        let mut resolved = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            let plugin = match block.plugin.as_deref().map(str::trim) {
                Some(plugin) if !plugin.is_empty() => plugin.to_string(),
                _ => return Err(ConfigError::MissingPlugin { index }),
            };
            let name = block.name.clone().unwrap_or_else(|| plugin.clone());

            let interval = block.interval.unwrap_or(1);
            if interval == 0 {
                return Err(ConfigError::InvalidInterval {
                    block: format!("{}_{}", plugin, name),
                    interval,
                });
            }

            let options = match registry.schema(&plugin) {
                Some(schema) => schema.validate(&block.options)?,
                None => {
                    debug!("Block {}_{} uses an unknown plugin", plugin, name);
                    Options::new()
                }
            };

            resolved.push(BlockDescriptor {
                plugin,
                name,
                interval: Duration::from_secs(interval),
                options,
            });
        }
        Ok(resolved)
    }
}

fn default_interval() -> u64 {
    1
}

fn default_theme() -> String {
    "default".to_string()
}

fn default_startup_delay() -> u64 {
    100
}
