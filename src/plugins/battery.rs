use crate::config::options::{parsers, OptionSchema};
use crate::error::ConfigError;
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::themes::Palette;
use crate::utils::template;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

const DEFAULT_BATTERY: &str = "/sys/class/power_supply/BAT1";
const DEFAULT_ADAPTER: &str = "/sys/class/power_supply/ACAD";

pub struct BatteryPlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl BatteryPlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("battery");
        schema.register_option("text", parsers::template, false);
        schema.register_option("threshold_warn", parsers::int, false);
        schema.register_option("threshold_crit", parsers::int, false);
        schema.register_option("battery", parsers::text, false);
        schema.register_option("adapter", parsers::text, false);
        Self {
            info: PluginInfo::new("battery", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for BatteryPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for BatteryPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        Ok(Box::new(BatterySensor {
            text: ctx.template("text", "B: {charge}%"),
            threshold_warn: ctx.options.int("threshold_warn").unwrap_or(30),
            threshold_crit: ctx.options.int("threshold_crit").unwrap_or(15),
            battery: PathBuf::from(ctx.options.text("battery").unwrap_or(DEFAULT_BATTERY)),
            adapter: PathBuf::from(ctx.options.text("adapter").unwrap_or(DEFAULT_ADAPTER)),
            palette: ctx.palette(&["ok", "warn", "crit", "charge"]),
        }))
    }
}

pub struct BatterySensor {
    text: String,
    threshold_warn: i64,
    threshold_crit: i64,
    battery: PathBuf,
    adapter: PathBuf,
    palette: Palette,
}

impl BatterySensor {
    fn state(&self, charge: i64, charging: bool) -> &'static str {
        if charging {
            "charge"
        } else if charge <= self.threshold_crit {
            "crit"
        } else if charge <= self.threshold_warn {
            "warn"
        } else {
            "ok"
        }
    }
}

async fn read_int(path: &Path) -> Result<i64> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    raw.trim()
        .parse()
        .with_context(|| format!("{} does not hold a number", path.display()))
}

#[async_trait]
impl Sensor for BatterySensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let charging = read_int(&self.adapter.join("online")).await? != 0;
        let charge = read_int(&self.battery.join("capacity")).await?;
        let text = template::render(&self.text, &[("charge", charge.into())]);
        Ok(Reading::mirrored(text).with_color(self.palette.get(self.state(charge, charging))))
    }
}
