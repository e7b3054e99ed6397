use crate::config::options::{parsers, OptionSchema};
use crate::error::ConfigError;
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Local, Utc};
use std::fmt::Write as _;

const DEFAULT_TEXT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_SHORT: &str = "%H:%M:%S";

pub struct ClockPlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl ClockPlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("clock");
        schema.register_option("text", parsers::strftime, false);
        schema.register_option("short", parsers::strftime, false);
        schema.register_option("utc", parsers::boolean, false);
        Self {
            info: PluginInfo::new("clock", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for ClockPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ClockPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        Ok(Box::new(ClockSensor {
            text: ctx.template("text", DEFAULT_TEXT),
            short: ctx.template("short", DEFAULT_SHORT),
            utc: ctx.options.bool("utc").unwrap_or(false),
        }))
    }
}

pub struct ClockSensor {
    text: String,
    short: String,
    utc: bool,
}

impl ClockSensor {
    fn format(&self, fmt: &str) -> Result<String> {
        let mut out = String::new();
        if fmt.is_empty() {
            return Ok(out);
        }
        let written = if self.utc {
            write!(out, "{}", Utc::now().format(fmt))
        } else {
            write!(out, "{}", Local::now().format(fmt))
        };
        written.map_err(|_| anyhow!("cannot format the time with '{}'", fmt))?;
        Ok(out)
    }
}

#[async_trait]
impl Sensor for ClockSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let mut reading = Reading::new(self.format(&self.text)?);
        if !self.short.is_empty() {
            reading = reading.with_short(self.format(&self.short)?);
        }
        Ok(reading)
    }
}
