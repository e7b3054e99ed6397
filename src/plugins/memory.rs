use crate::config::options::{OptionSchema, OptionValue};
use crate::error::ConfigError;
use crate::plugins::storage::{self, Storage};
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::utils::Cache;
use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

/// One refresh of `/proc/meminfo` serves every memory block polled within
/// this window.
const SNAPSHOT_TTL: Duration = Duration::from_millis(500);

static SNAPSHOTS: Lazy<Cache<(), MemoryStats>> = Lazy::new(|| Cache::new(SNAPSHOT_TTL));
static SYSTEM: Lazy<Mutex<System>> = Lazy::new(|| {
    Mutex::new(System::new_with_specifics(
        RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
    ))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemorySource {
    Ram,
    Swap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub ram_total: u64,
    pub ram_available: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl MemoryStats {
    pub fn total(&self, source: MemorySource) -> u64 {
        match source {
            MemorySource::Ram => self.ram_total,
            MemorySource::Swap => self.swap_total,
        }
    }

    pub fn available(&self, source: MemorySource) -> u64 {
        match source {
            MemorySource::Ram => self.ram_available,
            MemorySource::Swap => self.swap_free,
        }
    }
}

fn read_stats() -> MemoryStats {
    let mut system = SYSTEM
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    system.refresh_memory();
    MemoryStats {
        ram_total: system.total_memory(),
        ram_available: system.available_memory(),
        swap_total: system.total_swap(),
        swap_free: system.free_swap(),
    }
}

fn current_stats() -> MemoryStats {
    SNAPSHOTS.get_or_refresh(&(), read_stats)
}

/// `ram`/`swap`, or the legacy numeric codes `1`/`2`.
fn parse_source(value: &Value) -> Result<OptionValue, String> {
    let source = match value {
        Value::String(s) => s.trim().to_lowercase(),
        Value::Number(n) => n.to_string(),
        other => return Err(format!("expected ram or swap, got {}", other)),
    };
    match source.as_str() {
        "ram" | "1" => Ok(OptionValue::Text("ram".to_string())),
        "swap" | "2" => Ok(OptionValue::Text("swap".to_string())),
        _ => Err(format!("expected ram or swap, got '{}'", source)),
    }
}

pub struct MemoryPlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl MemoryPlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("memory");
        storage::register_options(&mut schema);
        schema.register_option("source", parse_source, false);
        Self {
            info: PluginInfo::new("memory", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for MemoryPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for MemoryPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        let source = match ctx.options.text("source") {
            Some("swap") => MemorySource::Swap,
            _ => MemorySource::Ram,
        };
        let total = current_stats().total(source);
        let storage = Storage::from_context(ctx, total * 2 / 5, total / 10, "{avail}");
        Ok(Box::new(MemorySensor { source, storage }))
    }
}

pub struct MemorySensor {
    source: MemorySource,
    storage: Storage,
}

#[async_trait]
impl Sensor for MemorySensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let avail = current_stats().available(self.source);
        Ok(self.storage.reading(avail))
    }
}
