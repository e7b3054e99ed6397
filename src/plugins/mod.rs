//! Sensor plugins.
//!
//! A [`Plugin`] is a factory: it declares its option schema once and
//! builds one [`Sensor`] per configured block. The sensor does the actual
//! reading; the worker that owns it takes care of scheduling and of
//! applying the [`Reading`] to the block.

pub mod battery;
pub mod clock;
pub mod cpu;
pub mod disk;
pub mod external;
pub mod loadavg;
pub mod memory;
pub mod storage;
pub mod temperature;
pub mod uptime;
pub mod wifi;
pub mod zfs;

pub use battery::BatteryPlugin;
pub use clock::ClockPlugin;
pub use cpu::CpuPlugin;
pub use disk::DiskPlugin;
pub use external::ExternalPlugin;
pub use loadavg::LoadavgPlugin;
pub use memory::MemoryPlugin;
pub use temperature::TemperaturePlugin;
pub use uptime::UptimePlugin;
pub use wifi::WifiPlugin;
pub use zfs::ZfsPlugin;

use crate::bar::BlockState;
use crate::config::options::{OptionSchema, Options};
use crate::error::ConfigError;
use crate::themes::{Palette, Theme};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: Option<String>,
}

impl Author {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            email: None,
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) => write!(f, "{} <{}>", self.name, email),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub author: Author,
}

impl PluginInfo {
    pub fn new(name: &str, version: &str, author: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            author: Author::new(author),
        }
    }
}

/// The result of one fetch, applied to a block in a single locked step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub full_text: String,
    #[serde(default)]
    pub short_text: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub urgent: Option<bool>,
}

impl Reading {
    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            ..Self::default()
        }
    }

    /// Use the full text as short text as well.
    pub fn mirrored(full_text: impl Into<String>) -> Self {
        let full_text = full_text.into();
        Self {
            short_text: Some(full_text.clone()),
            full_text,
            ..Self::default()
        }
    }

    pub fn with_short(mut self, short_text: impl Into<String>) -> Self {
        self.short_text = Some(short_text.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_urgent(mut self, urgent: bool) -> Self {
        self.urgent = Some(urgent);
        self
    }

    /// Write the reading into a (locked) block state. Text fields are
    /// replaced wholesale; color and urgency only when the reading has them,
    /// so configured block colors survive sensors that don't pick one.
    pub fn apply(self, state: &mut BlockState) {
        state.full_text = Some(self.full_text);
        state.short_text = self.short_text;
        if let Some(color) = self.color {
            state.color = Some(color);
        }
        if let Some(urgent) = self.urgent {
            state.urgent = Some(urgent);
        }
    }
}

/// Everything a plugin needs to build a sensor for one block.
pub struct InstanceContext<'a> {
    pub plugin: &'a str,
    pub instance: &'a str,
    pub options: &'a Options,
    pub theme: &'a Theme,
}

impl InstanceContext<'_> {
    /// A construction-time error for this instance.
    pub fn error(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::plugin(self.plugin, self.instance, reason)
    }

    pub fn palette(&self, states: &[&str]) -> Palette {
        self.theme.palette(self.options.color("color"), states)
    }

    pub fn template(&self, name: &str, default: &str) -> String {
        self.options.text(name).unwrap_or(default).to_string()
    }

    /// `plugin_instance` log context.
    pub fn key(&self) -> String {
        format!("{}_{}", self.plugin, self.instance)
    }
}

/// Reads one value and formats it for display.
#[async_trait]
pub trait Sensor: Send {
    async fn fetch(&mut self) -> Result<Reading>;
}

pub type BoxedSensor = Box<dyn Sensor>;

/// A named sensor factory.
pub trait Plugin: Send + Sync {
    fn info(&self) -> &PluginInfo;

    fn schema(&self) -> &OptionSchema;

    /// Build a sensor for one block. Failing here is a configuration error.
    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError>;

    fn name(&self) -> &str {
        &self.info().name
    }
}

pub type BoxedPlugin = Box<dyn Plugin>;

/// The compiled-in plugin table.
pub fn builtin() -> Vec<BoxedPlugin> {
    vec![
        Box::new(BatteryPlugin::new()),
        Box::new(ClockPlugin::new()),
        Box::new(CpuPlugin::new()),
        Box::new(DiskPlugin::new()),
        Box::new(LoadavgPlugin::new()),
        Box::new(MemoryPlugin::new()),
        Box::new(TemperaturePlugin::new()),
        Box::new(UptimePlugin::new()),
        Box::new(WifiPlugin::new()),
        Box::new(ZfsPlugin::new()),
    ]
}
