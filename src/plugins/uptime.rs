use crate::config::options::{parsers, OptionSchema};
use crate::error::ConfigError;
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::utils::template;
use anyhow::Result;
use async_trait::async_trait;
use sysinfo::System;

pub struct UptimePlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl UptimePlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("uptime");
        schema.register_option("text", parsers::template, false);
        Self {
            info: PluginInfo::new("uptime", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for UptimePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for UptimePlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        Ok(Box::new(UptimeSensor {
            text: ctx.template("text", "U: {uptime}"),
        }))
    }
}

/// `H:MM:SS`, prefixed with `N day(s), ` once past the first day.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3600;
    let minutes = seconds % 3600 / 60;
    let secs = seconds % 60;
    match days {
        0 => format!("{}:{:02}:{:02}", hours, minutes, secs),
        1 => format!("1 day, {}:{:02}:{:02}", hours, minutes, secs),
        n => format!("{} days, {}:{:02}:{:02}", n, hours, minutes, secs),
    }
}

pub struct UptimeSensor {
    text: String,
}

#[async_trait]
impl Sensor for UptimeSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let uptime = format_uptime(System::uptime());
        Ok(Reading::mirrored(template::render(
            &self.text,
            &[("uptime", uptime.into())],
        )))
    }
}
