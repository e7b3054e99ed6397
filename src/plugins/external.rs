//! Plugins living outside the binary.
//!
//! An external plugin is any executable in the plugin directory. It is
//! asked to describe itself once with `<exe> info` and then run as
//! `<exe> fetch <instance>` for every reading, with the block's options
//! passed as JSON in `STATUSBLOCKS_OPTIONS`.

use crate::config::options::{parsers, OptionParser, OptionSchema};
use crate::error::{ConfigError, PluginError};
use crate::plugins::{Author, BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::utils::is_executable;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use walkdir::WalkDir;

pub const OPTIONS_ENV: &str = "STATUSBLOCKS_OPTIONS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Int,
    Float,
    Bool,
    Text,
    Color,
    Size,
    Path,
}

impl OptionType {
    fn parser(self) -> OptionParser {
        match self {
            OptionType::Int => parsers::int,
            OptionType::Float => parsers::float,
            OptionType::Bool => parsers::boolean,
            OptionType::Text => parsers::text,
            OptionType::Color => parsers::color,
            OptionType::Size => parsers::size,
            OptionType::Path => parsers::existing_path,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionDescription {
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default)]
    pub required: bool,
}

/// The reply to `<exe> info`.
#[derive(Debug, Clone, Deserialize)]
pub struct Description {
    pub name: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub options: BTreeMap<String, OptionDescription>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

fn default_author() -> String {
    "unknown".to_string()
}

/// Executables in `dir`, sorted by name. Hidden files and `__` prefixed
/// helpers are skipped.
pub fn discover(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && !name.starts_with("__")
        })
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file())
        .collect();
    found.sort();
    found
}

pub struct ExternalPlugin {
    info: PluginInfo,
    schema: OptionSchema,
    path: PathBuf,
}

impl ExternalPlugin {
    /// Ask the executable at `path` to describe itself.
    pub async fn load(path: &Path) -> Result<Self, PluginError> {
        if !is_executable(path) {
            return Err(PluginError::NotExecutable {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(path)
            .arg("info")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PluginError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if !output.status.success() {
            return Err(PluginError::InvalidInfo {
                path: path.to_path_buf(),
                reason: format!("'info' exited with {}", output.status),
            });
        }

        let description: Description =
            serde_json::from_slice(&output.stdout).map_err(|e| PluginError::InvalidInfo {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::from_description(path, description)
    }

    pub fn from_description(path: &Path, description: Description) -> Result<Self, PluginError> {
        let name = match description.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .ok_or_else(|| PluginError::InvalidInfo {
                    path: path.to_path_buf(),
                    reason: "plugin has no name".to_string(),
                })?,
        };

        let mut schema = OptionSchema::new(&name);
        for (option, spec) in &description.options {
            schema.register_option(option, spec.kind.parser(), spec.required);
        }

        Ok(Self {
            info: PluginInfo {
                name,
                version: description.version,
                author: Author::new(&description.author),
            },
            schema,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Plugin for ExternalPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        let options = serde_json::to_string(ctx.options)
            .map_err(|e| ctx.error(format!("cannot encode options: {}", e)))?;
        Ok(Box::new(ExternalSensor {
            path: self.path.clone(),
            instance: ctx.instance.to_string(),
            options,
        }))
    }
}

pub struct ExternalSensor {
    path: PathBuf,
    instance: String,
    options: String,
}

#[async_trait]
impl Sensor for ExternalSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let output = Command::new(&self.path)
            .arg("fetch")
            .arg(&self.instance)
            .env(OPTIONS_ENV, &self.options)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.path.display()))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("{} printed an invalid reading", self.path.display()))
    }
}
