use crate::config::options::{parsers, OptionSchema};
use crate::error::ConfigError;
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::themes::Palette;
use crate::utils::template;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct TemperaturePlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl TemperaturePlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("temperature");
        schema.register_option("path", parsers::existing_path, true);
        schema.register_option("text", parsers::template, false);
        schema.register_option("threshold_warn", parsers::float, false);
        schema.register_option("threshold_err", parsers::float, false);
        Self {
            info: PluginInfo::new("temperature", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for TemperaturePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for TemperaturePlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        let path = ctx
            .options
            .path("path")
            .ok_or_else(|| ctx.error("no sensor path given"))?
            .to_path_buf();
        Ok(Box::new(TemperatureSensor {
            path,
            text: ctx.template("text", "T: {temp:.0}°C"),
            threshold_warn: ctx.options.float("threshold_warn").unwrap_or(40.0),
            threshold_err: ctx.options.float("threshold_err").unwrap_or(50.0),
            palette: ctx.palette(&["ok", "warn", "err"]),
        }))
    }
}

pub struct TemperatureSensor {
    path: PathBuf,
    text: String,
    threshold_warn: f64,
    threshold_err: f64,
    palette: Palette,
}

impl TemperatureSensor {
    /// Degrees Celsius; the kernel reports millidegrees.
    async fn read(&self) -> Result<f64> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let first = raw.lines().next().unwrap_or_default().trim();
        let milli: i64 = first
            .parse()
            .with_context(|| format!("unexpected sensor value '{}'", first))?;
        Ok(milli as f64 / 1000.0)
    }

    fn state(&self, temp: f64) -> &'static str {
        if temp >= self.threshold_err {
            "err"
        } else if temp >= self.threshold_warn {
            "warn"
        } else {
            "ok"
        }
    }
}

#[async_trait]
impl Sensor for TemperatureSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let temp = self.read().await?;
        let text = template::render(&self.text, &[("temp", temp.into())]);
        Ok(Reading::mirrored(text).with_color(self.palette.get(self.state(temp))))
    }
}
