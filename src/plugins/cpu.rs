use crate::config::options::{parsers, OptionSchema};
use crate::error::ConfigError;
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::themes::Palette;
use crate::utils::template;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

const DEFAULT_TEXT: &str = "C: {usage:.1}%";

pub struct CpuPlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl CpuPlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("cpu");
        schema.register_option("text", parsers::template, false);
        schema.register_option("threshold_warn", parsers::float, false);
        schema.register_option("threshold_err", parsers::float, false);
        schema.register_option("cpu", parsers::int, false);
        Self {
            info: PluginInfo::new("cpu", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for CpuPlugin {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed options of a cpu block.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuConfig {
    pub text: String,
    pub threshold_warn: f64,
    pub threshold_err: f64,
    /// Core to watch, or `None` for the average over all cores.
    pub core: Option<usize>,
}

impl CpuConfig {
    pub fn from_context(ctx: &InstanceContext<'_>) -> Result<Self, ConfigError> {
        let core = match ctx.options.int("cpu").unwrap_or(-1) {
            n if n < 0 => None,
            n => Some(usize::try_from(n).map_err(|_| ctx.error(format!("invalid cpu index {}", n)))?),
        };
        Ok(Self {
            text: ctx.template("text", DEFAULT_TEXT),
            threshold_warn: ctx.options.float("threshold_warn").unwrap_or(80.0),
            threshold_err: ctx.options.float("threshold_err").unwrap_or(90.0),
            core,
        })
    }

    /// Color state for a usage percentage.
    pub fn state(&self, usage: f64) -> &'static str {
        if usage > self.threshold_err {
            "err"
        } else if usage > self.threshold_warn {
            "warn"
        } else {
            "ok"
        }
    }
}

impl Plugin for CpuPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        let config = CpuConfig::from_context(ctx)?;

        let mut system =
            System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
        // The first sample only establishes a baseline.
        system.refresh_cpu_all();

        if let Some(core) = config.core {
            let count = system.cpus().len();
            if core >= count {
                return Err(ctx.error(format!(
                    "unknown cpu core {} (this machine has {})",
                    core, count
                )));
            }
        }

        Ok(Box::new(CpuSensor {
            palette: ctx.palette(&["ok", "warn", "err"]),
            config,
            system,
        }))
    }
}

pub struct CpuSensor {
    config: CpuConfig,
    palette: Palette,
    system: System,
}

impl CpuSensor {
    fn usage(&mut self) -> Result<f64> {
        self.system.refresh_cpu_all();
        let usage = match self.config.core {
            Some(core) => self
                .system
                .cpus()
                .get(core)
                .map(|cpu| cpu.cpu_usage())
                .ok_or_else(|| anyhow!("cpu core {} disappeared", core))?,
            None => self.system.global_cpu_usage(),
        };
        Ok(f64::from(usage))
    }
}

#[async_trait]
impl Sensor for CpuSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let usage = self.usage()?;
        let text = template::render(&self.config.text, &[("usage", usage.into())]);
        Ok(Reading::mirrored(text).with_color(self.palette.get(self.config.state(usage))))
    }
}
