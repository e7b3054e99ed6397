use crate::config::options::{parsers, OptionSchema};
use crate::error::ConfigError;
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::utils::template::{self, TemplateValue};
use anyhow::Result;
use async_trait::async_trait;
use sysinfo::System;

pub struct LoadavgPlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl LoadavgPlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("loadavg");
        schema.register_option("text", parsers::template, false);
        schema.register_option("short", parsers::template, false);
        Self {
            info: PluginInfo::new("loadavg", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for LoadavgPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for LoadavgPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        Ok(Box::new(LoadavgSensor {
            text: ctx.template("text", "L: {one:.2} {five:.2} {fifteen:.2}"),
            short: ctx.template("short", "L: {one:.2}"),
        }))
    }
}

pub struct LoadavgSensor {
    text: String,
    short: String,
}

#[async_trait]
impl Sensor for LoadavgSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let load = System::load_average();
        let values: [(&str, TemplateValue); 3] = [
            ("one", load.one.into()),
            ("five", load.five.into()),
            ("fifteen", load.fifteen.into()),
        ];
        let mut reading = Reading::new(template::render(&self.text, &values));
        if !self.short.is_empty() {
            reading = reading.with_short(template::render(&self.short, &values));
        }
        Ok(reading)
    }
}
