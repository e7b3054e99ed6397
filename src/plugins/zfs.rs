use crate::config::options::{parsers, OptionSchema};
use crate::error::ConfigError;
use crate::plugins::storage::{self, Storage};
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::utils::{find_binary, gib};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::error;
use std::path::PathBuf;
use tokio::process::Command;

pub struct ZfsPlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl ZfsPlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("zfs");
        storage::register_options(&mut schema);
        schema.register_option("dataset", parsers::text, true);
        schema.register_option("zfs", parsers::executable, false);
        Self {
            info: PluginInfo::new("zfs", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for ZfsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ZfsPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        let dataset = ctx
            .options
            .text("dataset")
            .ok_or_else(|| ctx.error("no dataset given"))?
            .to_string();
        let zfs = match ctx.options.path("zfs") {
            Some(path) => path.to_path_buf(),
            None => find_binary("zfs").ok_or_else(|| ctx.error("zfs binary not found"))?,
        };

        Ok(Box::new(ZfsSensor {
            key: ctx.key(),
            dataset,
            zfs,
            storage: Storage::from_context(ctx, gib(20), gib(10), "Z: {avail}"),
        }))
    }
}

pub struct ZfsSensor {
    key: String,
    dataset: String,
    zfs: PathBuf,
    storage: Storage,
}

impl ZfsSensor {
    async fn available(&self) -> Result<u64> {
        let output = Command::new(&self.zfs)
            .args(["list", "-H", "-p", "-o", "avail"])
            .arg(&self.dataset)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.zfs.display()))?;

        if !output.status.success() {
            bail!(
                "zfs list {} exited with {}: {}",
                self.dataset,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse()
            .with_context(|| format!("unexpected zfs output '{}'", stdout.trim()))
    }
}

#[async_trait]
impl Sensor for ZfsSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        // An unavailable dataset is shown as full rather than hidden.
        let avail = self.available().await.unwrap_or_else(|e| {
            error!("[{}] {:#}", self.key, e);
            0
        });
        Ok(self.storage.reading(avail))
    }
}
