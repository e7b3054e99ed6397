use crate::config::options::{parsers, OptionSchema};
use crate::error::ConfigError;
use crate::plugins::storage::{self, Storage};
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::utils::gib;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

pub struct DiskPlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl DiskPlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("disk");
        storage::register_options(&mut schema);
        schema.register_option("dir", parsers::directory, false);
        Self {
            info: PluginInfo::new("disk", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for DiskPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for DiskPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        let dir = match ctx.options.path("dir") {
            Some(dir) => dir.to_path_buf(),
            None if Path::new(ctx.instance).is_absolute() => PathBuf::from(ctx.instance),
            None => return Err(ctx.error("no 'dir' given and the instance name is not a path")),
        };
        if !dir.is_dir() {
            return Err(ctx.error(format!("{} is not a directory", dir.display())));
        }

        let default_text = format!("{}: {{avail}}", dir.display());
        let storage = Storage::from_context(ctx, gib(20), gib(10), &default_text);
        Ok(Box::new(DiskSensor {
            dir,
            storage,
            disks: Disks::new_with_refreshed_list(),
        }))
    }
}

pub struct DiskSensor {
    dir: PathBuf,
    storage: Storage,
    disks: Disks,
}

impl DiskSensor {
    /// Free bytes on the file system holding `dir`: the mount with the
    /// longest mount point that is a prefix of it.
    fn available(&mut self) -> Result<u64> {
        self.disks.refresh_list();
        self.disks
            .list()
            .iter()
            .filter(|disk| self.dir.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().components().count())
            .map(|disk| disk.available_space())
            .ok_or_else(|| anyhow!("no mounted file system holds {}", self.dir.display()))
    }
}

#[async_trait]
impl Sensor for DiskSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let avail = self.available()?;
        Ok(self.storage.reading(avail))
    }
}
